use super::*;
use crate::step::StepMeta;

struct CountingSequence {
    calls: Vec<String>,
}

#[async_trait]
impl Sequence for CountingSequence {
    fn name(&self) -> &str {
        "counting_sequence"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn steps(&self) -> Vec<StepMeta> {
        vec![StepMeta::new("power_on", 1), StepMeta::new("measure", 2)]
    }

    async fn run_step(&mut self, name: &str) -> StepOutcome {
        self.calls.push(name.to_string());
        if name == "measure" {
            Ok(Some(serde_json::json!({"measurements": {"voltage": 5.0}})))
        } else {
            Ok(None)
        }
    }
}

#[tokio::test]
async fn run_step_dispatches_by_name_and_records_calls() {
    let mut seq = CountingSequence { calls: Vec::new() };
    let outcome = seq.run_step("measure").await.unwrap();
    assert_eq!(seq.calls, vec!["measure".to_string()]);
    assert!(outcome.is_some());
}

#[test]
fn default_step_kind_is_async() {
    let seq = CountingSequence { calls: Vec::new() };
    assert_eq!(seq.step_kind("power_on"), StepKind::Async);
}

#[test]
fn default_blocking_impl_errors() {
    let mut seq = CountingSequence { calls: Vec::new() };
    let err = seq.run_step_blocking("power_on").unwrap_err();
    assert!(matches!(err, StepError::Other(_)));
}

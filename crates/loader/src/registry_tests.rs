use super::*;
use station_core::{HardwareMap, ParameterMap, Sequence, StepMeta, StepOutcome};

struct StubSequence;

#[async_trait::async_trait]
impl Sequence for StubSequence {
    fn name(&self) -> &str {
        "stub"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn steps(&self) -> Vec<StepMeta> {
        vec![StepMeta::new("only", 1)]
    }

    async fn run_step(&mut self, _name: &str) -> StepOutcome {
        Ok(None)
    }
}

#[test]
fn sequence_registry_round_trips_by_module_and_class() {
    let registry = SequenceRegistry::new();
    registry.register(
        "sequence",
        "StubSequence",
        std::sync::Arc::new(|_hw: HardwareMap, _params: ParameterMap| -> Box<dyn Sequence> { Box::new(StubSequence) }),
    );

    let factory = registry.get("sequence", "StubSequence").expect("registered factory");
    let instance = factory(HardwareMap::new(), ParameterMap::new());
    assert_eq!(instance.name(), "stub");

    assert!(registry.get("sequence", "OtherClass").is_none());
}

#[test]
fn driver_registry_round_trips_by_module_and_class() {
    let registry = DriverRegistry::new();
    registry.register(
        "mock",
        "MockDmm",
        std::sync::Arc::new(|_config: serde_json::Value| {
            Err(station_core::DriverError::Connection {
                driver: "mock".into(),
                message: "not wired up in this test".into(),
            })
        }),
    );

    let factory = registry.get("mock", "MockDmm").expect("registered factory");
    let result = factory(serde_json::json!({}));
    assert!(result.is_err());
    assert!(registry.get("mock", "Unknown").is_none());
}

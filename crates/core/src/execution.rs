//! The complete result of one sequence run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::step::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }
}

/// Complete result of a sequence execution (spec.md §3, `ExecutionResult`).
///
/// Invariant: `overall_pass` is true iff every non-skipped step in `steps`
/// passed, where "every ... step" ranges over the steps that actually ran
/// (all non-cleanup steps, or the prefix up to and including the first
/// failure/stop). Cleanup step outcomes never flip `overall_pass`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub sequence_name: String,
    pub sequence_version: String,
    pub status: ExecutionStatus,
    pub overall_pass: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub steps: Vec<StepResult>,
}

impl ExecutionResult {
    pub fn new(
        sequence_name: impl Into<String>,
        sequence_version: impl Into<String>,
        started_at: DateTime<Utc>,
        parameters: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            sequence_name: sequence_name.into(),
            sequence_version: sequence_version.into(),
            status: ExecutionStatus::Running,
            overall_pass: true,
            started_at,
            completed_at: None,
            duration_secs: None,
            parameters,
            steps: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_result_starts_running_and_passing() {
        let result = ExecutionResult::new("power_test", "1.0.0", Utc::now(), BTreeMap::new());
        assert_eq!(result.status, ExecutionStatus::Running);
        assert!(result.overall_pass);
        assert!(result.steps.is_empty());
    }
}

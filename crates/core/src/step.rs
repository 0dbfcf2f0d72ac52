//! Step-level data model: metadata attached to a sequence step and the
//! result recorded once it has run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static metadata describing a single step of a sequence.
///
/// In the source system this was attached to a method via a decorator
/// (`@step(order=..., timeout=..., retry=..., cleanup=..., condition=...)`);
/// here it is built once, at sequence-registration time, by whatever
/// constructs a [`crate::sequence::Sequence`] implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    pub order: i64,
    /// Per-attempt timeout, in seconds.
    pub timeout_secs: f64,
    /// Extra attempts after the first (so `retry=2` means up to 3 tries).
    pub retry: u32,
    pub cleanup: bool,
    /// Name of a parameter whose truthiness gates execution of this step.
    pub condition: Option<String>,
    pub name: String,
    pub description: String,
}

impl StepMeta {
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            order,
            timeout_secs: 60.0,
            retry: 0,
            cleanup: false,
            condition: None,
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: f64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Metadata describing a sequence-exposed parameter property (display name,
/// unit, description). Distinct from [`crate::manifest::ParameterDefinition`],
/// which describes the manifest-declared schema for the parameter; this is
/// the runtime-side mirror attached to the sequence implementation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMeta {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub description: String,
}

/// Outcome of a single step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Result of a single step execution.
///
/// Invariant (spec.md §3): `status == Skipped ⇒ passed == true` and
/// `status == Completed ⇒ passed == true`; both are upheld by construction
/// via the `completed`/`skipped`/`failed` constructors below rather than by
/// allowing arbitrary field assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub order: i64,
    pub status: StepStatus,
    pub passed: bool,
    pub duration_secs: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl StepResult {
    pub fn skipped(meta: &StepMeta) -> Self {
        Self {
            name: meta.name.clone(),
            order: meta.order,
            status: StepStatus::Skipped,
            passed: true,
            duration_secs: None,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn running(meta: &StepMeta, started_at: DateTime<Utc>) -> Self {
        Self {
            name: meta.name.clone(),
            order: meta.order,
            status: StepStatus::Running,
            passed: false,
            duration_secs: None,
            started_at: Some(started_at),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Measurements/outputs merged from the step result payload, used by
    /// the worker's completion path to build the backend's `measurements`
    /// map (spec.md §4.D step 1).
    pub fn measurements(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        let Some(serde_json::Value::Object(obj)) = &self.result else {
            return out;
        };
        for key in ["measurements", "outputs"] {
            if let Some(serde_json::Value::Object(nested)) = obj.get(key) {
                out.extend(nested.clone());
            }
        }
        out
    }

    /// Defect codes contributed by this step: the `defects` list plus, as a
    /// fallback, the failing error's "class name" (here just the error
    /// string itself, since Rust has no runtime type name for a dynamic
    /// error the way the source's `type(e).__name__` does).
    pub fn defect_codes(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(serde_json::Value::Object(obj)) = &self.result {
            if let Some(serde_json::Value::Array(defects)) = obj.get("defects") {
                for d in defects {
                    if let Some(s) = d.as_str() {
                        if !out.iter().any(|existing| existing == s) {
                            out.push(s.to_string());
                        }
                    }
                }
            }
        }
        if !self.passed {
            if let Some(err) = &self.error {
                let code = err.split(':').next().unwrap_or(err).trim().to_string();
                if !code.is_empty() && !out.contains(&code) {
                    out.push(code);
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

//! The `Sequence` seam: the Rust replacement for the source system's
//! decorator-discovered test class (station_service/sequence/decorators.py).
//!
//! A `Sequence` no longer exposes its steps via runtime introspection of
//! `@step`-decorated methods; it declares them up front as a `Vec<StepMeta>`
//! and dispatches execution by name. The registration-struct substitution is
//! recorded in SPEC_FULL.md's redesign notes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::driver::HardwareMap;
use crate::step::{ParameterMeta, StepMeta};

pub type ParameterMap = BTreeMap<String, serde_json::Value>;

/// Error raised by a step body while it runs.
///
/// `TestFailure`/`TestSkipped` mirror the source's matching exception
/// classes and are distinguished from `Other` because the executor treats
/// them differently: a failure fails the step and (for non-cleanup steps)
/// stops the sequence; a skip marks the step skipped-and-passed without
/// affecting `overall_pass`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    #[error("{0}")]
    TestFailure(String),
    #[error("{0}")]
    TestSkipped(String),
    #[error("{0}")]
    Other(String),
}

pub type StepOutcome = Result<Option<serde_json::Value>, StepError>;

/// Whether a step's body should be awaited directly or run on a blocking
/// executor. The source distinguished these at call time by checking
/// `inspect.iscoroutinefunction`; here the sequence declares it up front so
/// the executor knows, before calling, whether to dispatch to
/// `spawn_blocking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Async,
    Blocking,
}

/// A concrete, constructed test sequence.
///
/// Implementations own their injected hardware and parameters (built by
/// whatever constructs them, typically a [`SequenceFactory`] registered in
/// `station-loader`'s registry) and dispatch step bodies by name.
#[async_trait]
pub trait Sequence: Send {
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    /// Step metadata in declaration order (not yet sorted for execution;
    /// the executor applies the `(order, name)` ordering itself).
    fn steps(&self) -> Vec<StepMeta>;

    /// Parameter metadata exposed by this sequence, if any.
    fn parameters(&self) -> Vec<ParameterMeta> {
        Vec::new()
    }

    fn step_kind(&self, name: &str) -> StepKind {
        let _ = name;
        StepKind::Async
    }

    /// Run the named step's async body. Called when `step_kind` reports
    /// [`StepKind::Async`].
    async fn run_step(&mut self, name: &str) -> StepOutcome;

    /// Run the named step's blocking body. Called when `step_kind` reports
    /// [`StepKind::Blocking`]; the executor invokes this inside
    /// `block_in_place` so a slow driver call cannot stall the async runtime.
    fn run_step_blocking(&mut self, name: &str) -> StepOutcome {
        Err(StepError::Other(format!(
            "step '{name}' has no blocking implementation"
        )))
    }
}

/// Constructs a fresh [`Sequence`] instance for one execution, given the
/// hardware drivers and parameters resolved for that run.
///
/// Replaces the source's dynamic `SequenceClass(**hardware, **parameters)`
/// instantiation (station_service/sequence/manifest.py's `entry_point`
/// resolution feeding station_service/batch/worker.py's sequence
/// construction).
pub type SequenceFactory = Arc<dyn Fn(HardwareMap, ParameterMap) -> Box<dyn Sequence> + Send + Sync>;

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;

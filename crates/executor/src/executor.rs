//! The step-scheduling algorithm itself (spec.md §4.B): collect steps sorted
//! by `(order, name)`, partition regular/cleanup, run regular steps with
//! condition/timeout/retry semantics, always run cleanup, finalize
//! `overall_pass`/`status`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use station_core::{
    ExecutionResult, ExecutionStatus, ParameterMap, Sequence, StepError, StepKind, StepMeta,
    StepOutcome, StepResult, StepStatus,
};
use tokio::task::JoinHandle;
use tracing::Level;

use crate::callbacks::ExecutorCallbacks;

/// Stand-in installed in place of the real sequence while its blocking step
/// body is running on a `spawn_blocking` thread (see [`SequenceExecutor::call_step`]).
/// Only ever observed if a step is attempted while a previous blocking call
/// hasn't been reclaimed yet, or if that blocking call panicked.
struct NullSequence;

#[async_trait]
impl Sequence for NullSequence {
    fn name(&self) -> &str {
        ""
    }

    fn version(&self) -> &str {
        ""
    }

    fn steps(&self) -> Vec<StepMeta> {
        Vec::new()
    }

    async fn run_step(&mut self, name: &str) -> StepOutcome {
        Err(StepError::Other(format!(
            "step '{name}' has no sequence instance available (a prior blocking step hasn't finished or panicked)"
        )))
    }
}

/// The outcome of one attempt at running a step's body, distinguishing a
/// timed-out attempt from a normal `Ok`/`Err` result so `run_one` can apply
/// the same timeout handling regardless of [`StepKind`].
enum Attempt {
    Outcome(StepOutcome),
    TimedOut,
}

/// The full exception taxonomy a step attempt can end in, carried over from
/// the source's `sequence/exceptions.py` (`StepTimeoutError`) and recorded
/// as `StepResult::error`'s message text.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    #[error("step '{step}' timed out after {timeout_secs:.3}s (elapsed {elapsed_secs:.3}s)")]
    StepTimeout { step: String, timeout_secs: f64, elapsed_secs: f64 },
}

/// Cooperative stop flag shared between a running executor and whoever
/// requests a stop (spec.md §4.B: "`stop()` sets a flag; the current step
/// finishes first").
#[derive(Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one [`Sequence`] instance's ordered steps to completion against a
/// fixed parameter snapshot.
pub struct SequenceExecutor {
    sequence: Box<dyn Sequence>,
    parameters: ParameterMap,
    callbacks: ExecutorCallbacks,
    stop_token: StopToken,
    /// A blocking step's `spawn_blocking` handle, kept around when its
    /// timeout fires before the underlying call returns. Forced thread
    /// termination is unsafe (spec.md §9), so a hung blocking call keeps
    /// running in the background; this is how its sequence instance (and
    /// any late result) is reclaimed once it actually finishes.
    pending_blocking: Option<JoinHandle<(Box<dyn Sequence>, StepOutcome)>>,
}

impl SequenceExecutor {
    pub fn new(sequence: Box<dyn Sequence>, parameters: ParameterMap) -> Self {
        Self {
            sequence,
            parameters,
            callbacks: ExecutorCallbacks::new(),
            stop_token: StopToken::new(),
            pending_blocking: None,
        }
    }

    pub fn with_callbacks(mut self, callbacks: ExecutorCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// A clone of this executor's stop token, so a caller on another task
    /// can request a cooperative stop (spec.md §4.D `STOP_SEQUENCE`).
    pub fn stop_token(&self) -> StopToken {
        self.stop_token.clone()
    }

    pub fn request_stop(&self) {
        self.stop_token.stop();
    }

    /// Run every step to completion, in the exact order spec.md §4.B
    /// describes, and return the finished [`ExecutionResult`].
    pub async fn run(&mut self) -> ExecutionResult {
        let started_at = Utc::now();
        let mut result = ExecutionResult::new(
            self.sequence.name().to_string(),
            self.sequence.version().to_string(),
            started_at,
            self.parameters.clone(),
        );

        let mut steps = self.sequence.steps();
        steps.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        let (cleanup, regular): (Vec<StepMeta>, Vec<StepMeta>) =
            steps.into_iter().partition(|s| s.cleanup);

        let mut stopped = false;
        for step in &regular {
            if self.stop_token.is_stopped() {
                result.status = ExecutionStatus::Stopped;
                stopped = true;
                break;
            }

            if let Some(condition) = &step.condition {
                if !is_truthy(self.parameters.get(condition)) {
                    let skip = StepResult::skipped(step);
                    self.callbacks.step_complete(&step.name, &skip);
                    result.steps.push(skip);
                    tokio::task::yield_now().await;
                    continue;
                }
            }

            let outcome = self.run_one(step).await;
            let failed = outcome.status == StepStatus::Failed;
            result.steps.push(outcome);
            tokio::task::yield_now().await;
            if failed {
                result.overall_pass = false;
                result.status = ExecutionStatus::Failed;
                break;
            }
        }

        for step in &cleanup {
            let outcome = self.run_one(step).await;
            result.steps.push(outcome);
            tokio::task::yield_now().await;
        }

        let completed_at = Utc::now();
        result.completed_at = Some(completed_at);
        result.duration_secs = Some(seconds_between(started_at, completed_at));
        if !stopped && result.status == ExecutionStatus::Running {
            result.status = if result.overall_pass {
                ExecutionStatus::Completed
            } else {
                ExecutionStatus::Failed
            };
        }
        result
    }

    /// Run one step's attempt loop (1 + `retry` tries), honoring its timeout.
    async fn run_one(&mut self, meta: &StepMeta) -> StepResult {
        self.callbacks.step_start(&meta.name, meta);
        let started_at = Utc::now();
        let start_instant = tokio::time::Instant::now();
        let max_attempts = 1 + meta.retry;

        let mut outcome: Option<(StepStatus, bool, Option<serde_json::Value>, Option<String>)> = None;
        for attempt in 1..=max_attempts {
            let timeout_dur = Duration::from_secs_f64(meta.timeout_secs.max(0.0));
            let attempt_result = self.call_step(&meta.name, timeout_dur).await;

            match attempt_result {
                Attempt::Outcome(Ok(value)) => {
                    outcome = Some((StepStatus::Completed, true, normalize_result(value), None));
                }
                Attempt::Outcome(Err(StepError::TestFailure(msg))) => {
                    self.callbacks.error(&meta.name, &msg);
                    outcome = Some((StepStatus::Failed, false, None, Some(msg)));
                }
                Attempt::Outcome(Err(StepError::TestSkipped(_))) => {
                    outcome = Some((StepStatus::Skipped, true, None, None));
                }
                Attempt::Outcome(Err(StepError::Other(msg))) => {
                    if attempt < max_attempts {
                        self.callbacks.log(
                            Level::WARN,
                            &format!("step '{}' attempt {attempt} failed, retrying: {msg}", meta.name),
                        );
                        continue;
                    }
                    self.callbacks.error(&meta.name, &msg);
                    outcome = Some((StepStatus::Failed, false, None, Some(msg)));
                }
                Attempt::TimedOut => {
                    let error = ExecutionError::StepTimeout {
                        step: meta.name.clone(),
                        timeout_secs: meta.timeout_secs,
                        elapsed_secs: start_instant.elapsed().as_secs_f64(),
                    };
                    if attempt < max_attempts {
                        self.callbacks.log(Level::WARN, &format!("{error}, retrying"));
                        continue;
                    }
                    let msg = error.to_string();
                    self.callbacks.error(&meta.name, &msg);
                    outcome = Some((StepStatus::Failed, false, None, Some(msg)));
                }
            }
            break;
        }

        let (status, passed, value, error) = outcome.unwrap_or_else(|| {
            (StepStatus::Failed, false, None, Some(format!("step '{}' produced no outcome", meta.name)))
        });

        let completed_at = Utc::now();
        let result = StepResult {
            name: meta.name.clone(),
            order: meta.order,
            status,
            passed,
            duration_secs: Some(seconds_between(started_at, completed_at)),
            started_at: Some(started_at),
            completed_at: Some(completed_at),
            result: value,
            error,
        };
        self.callbacks.step_complete(&meta.name, &result);
        result
    }

    /// Run one attempt of `name`'s body with `timeout` enforced. For
    /// [`StepKind::Async`] the timeout races the step future directly; for
    /// [`StepKind::Blocking`] the body runs on `spawn_blocking` so the
    /// timeout can actually race it (spec.md §4.B: "The timeout is enforced
    /// by cancellation/interruption"). `block_in_place` would run the
    /// closure synchronously on the current task, so a hung blocking step
    /// would never let the timeout future be polled — defeating it entirely.
    async fn call_step(&mut self, name: &str, timeout: Duration) -> Attempt {
        self.reclaim_pending_blocking().await;

        match self.sequence.step_kind(name) {
            StepKind::Async => match tokio::time::timeout(timeout, self.sequence.run_step(name)).await {
                Ok(outcome) => Attempt::Outcome(outcome),
                Err(_elapsed) => Attempt::TimedOut,
            },
            StepKind::Blocking => {
                let sequence = std::mem::replace(&mut self.sequence, Box::new(NullSequence));
                let owned_name = name.to_string();
                let mut handle: JoinHandle<(Box<dyn Sequence>, StepOutcome)> =
                    tokio::task::spawn_blocking(move || {
                        let mut sequence = sequence;
                        let outcome = sequence.run_step_blocking(&owned_name);
                        (sequence, outcome)
                    });

                tokio::select! {
                    joined = &mut handle => match joined {
                        Ok((sequence, outcome)) => {
                            self.sequence = sequence;
                            Attempt::Outcome(outcome)
                        }
                        Err(join_error) => {
                            tracing::error!(%join_error, step = name, "blocking step task panicked; sequence instance lost");
                            Attempt::Outcome(Err(StepError::Other(join_error.to_string())))
                        }
                    },
                    _ = tokio::time::sleep(timeout) => {
                        // The blocking thread can't be killed safely; keep the
                        // handle so a later call reclaims the sequence (and
                        // drains the now-irrelevant result) once it finishes.
                        self.pending_blocking = Some(handle);
                        Attempt::TimedOut
                    }
                }
            }
        }
    }

    /// Await any blocking step task left running past its own timeout,
    /// restoring `self.sequence` before the next attempt touches it.
    async fn reclaim_pending_blocking(&mut self) {
        if let Some(handle) = self.pending_blocking.take() {
            match handle.await {
                Ok((sequence, _outcome)) => self.sequence = sequence,
                Err(join_error) => {
                    tracing::error!(%join_error, "blocking step task panicked while reclaiming; sequence instance lost");
                }
            }
        }
    }
}

fn seconds_between(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> f64 {
    (end - start).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0
}

/// Normalize a step's return value into the map `StepResult::result` stores
/// (spec.md §4.B: already-a-map stays as-is, a bare scalar is wrapped as
/// `{"value": ...}`, `None`/`null` drops to no result).
fn normalize_result(value: Option<serde_json::Value>) -> Option<serde_json::Value> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(v @ serde_json::Value::Object(_)) => Some(v),
        Some(scalar) => Some(serde_json::json!({ "value": scalar })),
    }
}

/// JSON truthiness used to evaluate a step's `condition` parameter.
fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Array(a)) => !a.is_empty(),
        Some(serde_json::Value::Object(o)) => !o.is_empty(),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

//! Translates [`station_executor::ExecutorCallbacks`] invocations into the
//! worker's step-list bookkeeping and outbound [`WorkerEvent`]s (spec.md
//! §4.D "Step-callback behavior inside the worker").

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Level;

use station_core::{ExecutionId, StepMeta, StepResult};
use station_executor::ExecutorCallbacks;
use station_wire::{LogLevel, StatusUpdate, WorkerEvent};

use crate::state::{RunState, StepListEntry};

fn wire_level(level: Level) -> LogLevel {
    match level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::DEBUG | Level::TRACE => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
    }
}

fn status_update(state: &RunState, execution_id: ExecutionId) -> WorkerEvent {
    let current_step = state.steps.last().map(|s| s.name.clone());
    WorkerEvent::StatusUpdate(StatusUpdate {
        status: if state.started_count >= state.total_steps { "completing" } else { "running" }.to_string(),
        current_step,
        step_index: state.started_count,
        total_steps: state.total_steps,
        progress: state.progress(),
        execution_id: Some(execution_id),
    })
}

/// Build the [`ExecutorCallbacks`] a worker installs on every fresh
/// [`station_executor::SequenceExecutor`]: each callback updates the shared
/// `state` and forwards a translated event on `events`.
pub fn build(
    state: Arc<Mutex<RunState>>,
    events: UnboundedSender<WorkerEvent>,
    execution_id: ExecutionId,
    total_steps: usize,
) -> ExecutorCallbacks {
    let start_state = state.clone();
    let start_events = events.clone();
    let complete_state = state.clone();
    let complete_events = events.clone();
    let log_events = events.clone();
    let error_events = events;

    ExecutorCallbacks::new()
        .with_on_step_start(move |name: &str, _meta: &StepMeta| {
            let mut guard = start_state.lock();
            guard.started_count += 1;
            let index = guard.started_count - 1;
            guard.upsert_step(StepListEntry::running(name));
            let _ = start_events.send(WorkerEvent::StepStart {
                step: name.to_string(),
                index,
                total: total_steps,
                execution_id,
            });
            let _ = start_events.send(status_update(&guard, execution_id));
        })
        .with_on_step_complete(move |name: &str, result: &StepResult| {
            let mut guard = complete_state.lock();
            let index = guard.steps.iter().position(|s| s.name == name).unwrap_or(guard.started_count);
            guard.upsert_step(StepListEntry {
                name: name.to_string(),
                status: result.status,
                duration_secs: result.duration_secs,
                passed: Some(result.passed),
                result: result.result.clone(),
            });
            let _ = complete_events.send(WorkerEvent::StepComplete {
                step: name.to_string(),
                index,
                duration_secs: result.duration_secs,
                passed: result.passed,
                result: result.result.clone(),
                execution_id,
            });
            let _ = complete_events.send(status_update(&guard, execution_id));
        })
        .with_on_log(move |level: Level, message: &str| {
            let _ = log_events.send(WorkerEvent::Log { level: wire_level(level), message: message.to_string() });
        })
        .with_on_error(move |step: &str, error: &str| {
            let _ = error_events.send(WorkerEvent::Error {
                code: "StepError".to_string(),
                message: error.to_string(),
                step: Some(step.to_string()),
            });
        })
}

//! Worker→master event channel (spec.md §4.C): typed events tagged with the
//! publishing batch's id. Delivery from one worker is FIFO; across workers no
//! order is guaranteed (spec.md §4.C "Ordering").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use station_core::{BatchId, ExecutionId, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Snapshot published whenever step progress changes (spec.md §4.C: the
/// `STATUS_UPDATE` event).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub current_step: Option<String>,
    pub step_index: usize,
    pub total_steps: usize,
    /// 0.0..=1.0
    pub progress: f64,
    pub execution_id: Option<ExecutionId>,
}

/// A single event published by a worker, always tagged with its batch id so
/// the master can re-emit it with the right scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    StepStart {
        step: String,
        index: usize,
        total: usize,
        execution_id: ExecutionId,
    },
    StepComplete {
        step: String,
        index: usize,
        duration_secs: Option<f64>,
        passed: bool,
        #[serde(default)]
        result: Option<serde_json::Value>,
        execution_id: ExecutionId,
    },
    SequenceComplete {
        execution_id: ExecutionId,
        overall_pass: bool,
        duration_secs: Option<f64>,
        steps: Vec<StepResult>,
    },
    WipProcessComplete {
        wip_id: String,
        process_id: Option<u32>,
        result: String,
        wip_status: Option<String>,
        can_convert: bool,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    Error {
        code: String,
        message: String,
        step: Option<String>,
    },
    StatusUpdate(StatusUpdate),
}

/// Envelope stamping a [`WorkerEvent`] with its origin batch and publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEvent {
    pub batch_id: BatchId,
    pub timestamp: DateTime<Utc>,
    pub event: WorkerEvent,
}

impl BatchEvent {
    pub fn new(batch_id: BatchId, timestamp: DateTime<Utc>, event: WorkerEvent) -> Self {
        Self { batch_id, timestamp, event }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

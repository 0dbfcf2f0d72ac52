//! In-memory run state tracked by a [`crate::worker::Worker`] across one
//! `START_SEQUENCE`/`SEQUENCE_COMPLETE` cycle (spec.md §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use station_core::{ExecutionId, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Running,
}

/// One row of the per-step status list `GET_STATUS` reports, upserted by
/// `on_step_start`/`on_step_complete` (spec.md §4.D: "update the last entry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepListEntry {
    pub name: String,
    pub status: StepStatus,
    pub duration_secs: Option<f64>,
    pub passed: Option<bool>,
    pub result: Option<serde_json::Value>,
}

impl StepListEntry {
    pub fn running(name: impl Into<String>) -> Self {
        Self { name: name.into(), status: StepStatus::Running, duration_secs: None, passed: None, result: None }
    }
}

/// WIP context extracted from `START_SEQUENCE` parameters, remembered for
/// the completion path (spec.md §4.D).
#[derive(Debug, Clone)]
pub struct WipContext {
    pub wip_id: String,
    pub wip_int_id: u64,
    pub process_id: u32,
    pub operator_id: String,
    pub equipment_id: Option<String>,
}

/// Snapshot preserved after a sequence finishes, so `GET_STATUS` while idle
/// still reports the last run's step list and progress (spec.md §4.D).
#[derive(Debug, Clone)]
pub struct LastRun {
    pub execution_id: ExecutionId,
    pub steps: Vec<StepListEntry>,
    pub passed: bool,
}

/// Running pass/fail counters, backing `GET_STATUS`'s optional statistics
/// payload and `station-daemon`'s `getAllBatchStatistics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub total: u64,
    pub pass: u64,
    pub fail: u64,
}

impl Stats {
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.pass += 1;
        } else {
            self.fail += 1;
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.pass as f64 / self.total as f64
        }
    }
}

/// The worker's current run state: either idle (with an optional preserved
/// last run) or running a sequence.
pub struct RunState {
    pub status: WorkerStatus,
    pub execution_id: Option<ExecutionId>,
    pub started_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepListEntry>,
    pub total_steps: usize,
    pub started_count: usize,
    pub wip_context: Option<WipContext>,
    pub stop_token: Option<station_executor::StopToken>,
    pub task: Option<tokio::task::JoinHandle<()>>,
    pub last_run: Option<LastRun>,
    pub stats: Stats,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            status: WorkerStatus::Idle,
            execution_id: None,
            started_at: None,
            steps: Vec::new(),
            total_steps: 0,
            started_count: 0,
            wip_context: None,
            stop_token: None,
            task: None,
            last_run: None,
            stats: Stats::default(),
        }
    }
}

impl RunState {
    pub fn progress(&self) -> f64 {
        match self.status {
            WorkerStatus::Idle if self.last_run.is_some() => 1.0,
            WorkerStatus::Idle => 0.0,
            WorkerStatus::Running if self.total_steps == 0 => 0.0,
            WorkerStatus::Running => (self.started_count as f64 / self.total_steps as f64).min(1.0),
        }
    }

    /// Upsert a step entry by name: update in place if already present
    /// (e.g. `on_step_complete` following `on_step_start`), else append (a
    /// skipped step never calls `on_step_start`).
    pub fn upsert_step(&mut self, entry: StepListEntry) {
        if let Some(existing) = self.steps.iter_mut().find(|s| s.name == entry.name) {
            *existing = entry;
        } else {
            self.steps.push(entry);
        }
    }

    pub fn begin_run(&mut self, execution_id: ExecutionId, started_at: DateTime<Utc>, total_steps: usize, stop_token: station_executor::StopToken) {
        self.status = WorkerStatus::Running;
        self.execution_id = Some(execution_id);
        self.started_at = Some(started_at);
        self.steps = Vec::new();
        self.total_steps = total_steps;
        self.started_count = 0;
        self.stop_token = Some(stop_token);
        self.task = None;
    }

    pub fn set_task(&mut self, task: tokio::task::JoinHandle<()>) {
        self.task = Some(task);
    }

    pub fn finish_run(&mut self, execution_id: ExecutionId, passed: bool) {
        self.last_run = Some(LastRun { execution_id, steps: self.steps.clone(), passed });
        self.stats.record(passed);
        self.status = WorkerStatus::Idle;
        self.execution_id = None;
        self.started_at = None;
        self.wip_context = None;
        self.stop_token = None;
        self.task = None;
    }

    /// Signal a cooperative stop (spec.md §4.D `STOP_SEQUENCE`/`SHUTDOWN`):
    /// the executor finishes its current step, then runs its cleanup phase
    /// regardless of outcome (spec.md §4.B "Cleanup phase ... always runs,
    /// including after a failure or stop"). Deliberately leaves
    /// `status`/`execution_id`/`task` untouched — those only change once the
    /// background task actually finishes and calls `finish_run`; resetting
    /// them here (or aborting the task) would skip cleanup and the
    /// completion path's backend reporting.
    pub fn request_stop(&self) {
        if let Some(token) = &self.stop_token {
            token.stop();
        }
    }

    /// Take the running task's `JoinHandle`, if any, so the caller can await
    /// it to completion outside this state's lock.
    pub fn take_task(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        self.task.take()
    }
}

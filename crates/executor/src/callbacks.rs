//! Executor callback contract (spec.md §4.B).
//!
//! Callbacks are plain `FnMut` trait objects invoked synchronously from the
//! executor's own loop. None of them are allowed to stop the loop: a
//! callback that wants to do I/O schedules its own task and returns
//! immediately, matching spec.md's "never throw" contract without relying
//! on `catch_unwind` at every call site.

use station_core::{StepMeta, StepResult};

pub type StepStartCallback = Box<dyn FnMut(&str, &StepMeta) + Send>;
pub type StepCompleteCallback = Box<dyn FnMut(&str, &StepResult) + Send>;
pub type LogCallback = Box<dyn FnMut(tracing::Level, &str) + Send>;
pub type ErrorCallback = Box<dyn FnMut(&str, &str) + Send>;

/// The four optional callbacks named in spec.md §4.B.
#[derive(Default)]
pub struct ExecutorCallbacks {
    pub on_step_start: Option<StepStartCallback>,
    pub on_step_complete: Option<StepCompleteCallback>,
    pub on_log: Option<LogCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl ExecutorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_step_start(mut self, f: impl FnMut(&str, &StepMeta) + Send + 'static) -> Self {
        self.on_step_start = Some(Box::new(f));
        self
    }

    pub fn with_on_step_complete(mut self, f: impl FnMut(&str, &StepResult) + Send + 'static) -> Self {
        self.on_step_complete = Some(Box::new(f));
        self
    }

    pub fn with_on_log(mut self, f: impl FnMut(tracing::Level, &str) + Send + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }

    pub fn with_on_error(mut self, f: impl FnMut(&str, &str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn step_start(&mut self, name: &str, meta: &StepMeta) {
        if let Some(cb) = &mut self.on_step_start {
            cb(name, meta);
        }
    }

    pub(crate) fn step_complete(&mut self, name: &str, result: &StepResult) {
        if let Some(cb) = &mut self.on_step_complete {
            cb(name, result);
        }
    }

    pub(crate) fn log(&mut self, level: tracing::Level, message: &str) {
        if let Some(cb) = &mut self.on_log {
            cb(level, message);
        }
    }

    pub(crate) fn error(&mut self, step_name: &str, error: &str) {
        if let Some(cb) = &mut self.on_error {
            cb(step_name, error);
        }
    }
}

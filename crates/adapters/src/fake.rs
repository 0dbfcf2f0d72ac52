//! In-memory [`HardwareDriver`] for other crates' tests, mirroring the
//! teacher's `FakeNotifyAdapter`: records calls, returns scripted responses,
//! never touches real IO.

use async_trait::async_trait;
use parking_lot::Mutex;
use station_core::{DriverError, HardwareDriver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: serde_json::Value,
}

struct FakeDriverState {
    calls: Vec<RecordedCall>,
    responses: HashMap<String, Result<serde_json::Value, DriverError>>,
}

/// A scriptable driver: callers register a response per method name up
/// front, then assert on the calls it recorded afterward.
#[derive(Clone)]
pub struct FakeDriver {
    name: String,
    connected: Arc<AtomicBool>,
    state: Arc<Mutex<FakeDriverState>>,
}

impl FakeDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(FakeDriverState { calls: Vec::new(), responses: HashMap::new() })),
        }
    }

    pub fn with_response(self, method: impl Into<String>, response: serde_json::Value) -> Self {
        self.state.lock().responses.insert(method.into(), Ok(response));
        self
    }

    pub fn with_error(self, method: impl Into<String>, error: DriverError) -> Self {
        self.state.lock().responses.insert(method.into(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl HardwareDriver for FakeDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DriverError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, DriverError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall { method: method.to_string(), params: params.clone() });
        match state.responses.get(method) {
            Some(result) => result.clone(),
            None => Ok(params),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

//! Typed in-process event bus (spec.md §4.F).
//!
//! Rust closures have no stable identity to compare against for `off`, so
//! `on`/`onAny` return a [`HandlerId`] token that `off` takes instead of the
//! handler itself — the same redesign substitution SPEC_FULL.md records for
//! the sequence registry's dynamic dispatch.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::ids::BatchId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    BatchStarted,
    BatchStopped,
    BatchCrashed,
    BatchStatusChanged,
    StepStarted,
    StepCompleted,
    SequenceCompleted,
    Log,
    Error,
    WipProcessComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub batch_id: Option<BatchId>,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    pub fn new(event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            batch_id: None,
            timestamp,
            data: serde_json::Map::new(),
        }
    }

    pub fn with_batch_id(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registered {
    id: HandlerId,
    handler: Handler,
}

/// Dispatches events to per-type and wildcard handlers.
///
/// Delivery order: per-type handlers first, in registration order, then
/// wildcard handlers, also in registration order. A handler that panics or
/// (if it returns a `Result` internally) errors is caught and logged; it
/// never stops delivery to the handlers after it. Emission is synchronous
/// and fire-and-forget from the caller's side — handlers needing I/O should
/// spawn their own task.
#[derive(Default)]
pub struct EventEmitter {
    next_id: Mutex<u64>,
    by_type: Mutex<HashMap<EventType, Vec<Registered>>>,
    wildcard: Mutex<Vec<Registered>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&self) -> HandlerId {
        let mut next = self.next_id.lock();
        let id = HandlerId(*next);
        *next += 1;
        id
    }

    pub fn on(&self, event_type: EventType, handler: Handler) -> HandlerId {
        let id = self.alloc_id();
        self.by_type.lock().entry(event_type).or_default().push(Registered { id, handler });
        id
    }

    pub fn on_any(&self, handler: Handler) -> HandlerId {
        let id = self.alloc_id();
        self.wildcard.lock().push(Registered { id, handler });
        id
    }

    /// Remove a handler previously returned by `on`/`on_any`, regardless of
    /// which list it lives in.
    pub fn off(&self, id: HandlerId) {
        self.by_type.lock().values_mut().for_each(|handlers| handlers.retain(|r| r.id != id));
        self.wildcard.lock().retain(|r| r.id != id);
    }

    pub fn emit(&self, event: Event) {
        let typed: Vec<Handler> = self
            .by_type
            .lock()
            .get(&event.event_type)
            .map(|handlers| handlers.iter().map(|r| r.handler.clone()).collect())
            .unwrap_or_default();
        for handler in &typed {
            run_handler(handler, &event);
        }

        let wildcard: Vec<Handler> = self.wildcard.lock().iter().map(|r| r.handler.clone()).collect();
        for handler in &wildcard {
            run_handler(handler, &event);
        }
    }
}

fn run_handler(handler: &Handler, event: &Event) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(event)));
    if outcome.is_err() {
        warn!(event_type = ?event.event_type, "event handler panicked");
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

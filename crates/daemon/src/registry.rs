//! Push-client subscriber registry (spec.md §4.I): a per-client set of batch
//! ids, fanning out batch events to connected UI/websocket clients.
//!
//! Grounded on the teacher's `oj-daemon::listener` connection-table pattern
//! (a mutex-guarded map of connected handles), scoped to this crate's
//! narrower "subscribe to batch ids, broadcast a frame" contract.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use station_core::BatchId;
use station_wire::OutboundFrame;
use tracing::warn;

/// A connected push client. `send` is fire-and-forget from the registry's
/// perspective: a failure is logged and the subscriber stays registered
/// (spec.md §4.I: "Send failures are logged and do not remove the
/// subscriber; disconnection is explicit").
pub trait Subscriber: Send + Sync {
    fn send(&self, frame: &OutboundFrame) -> Result<(), String>;
}

struct Entry {
    subscriber: Box<dyn Subscriber>,
    batch_ids: HashSet<BatchId>,
}

/// Maintains the subscriber → batch-id-set map described in spec.md §4.I.
///
/// Mutated under a single mutex; [`SubscriberRegistry::broadcast`] and
/// [`SubscriberRegistry::broadcast_all`] snapshot the subscriber list before
/// sending so a slow or failing subscriber's send never holds the lock
/// (spec.md §5: "broadcasts snapshot the subscriber list before iterating").
#[derive(Default)]
pub struct SubscriberRegistry {
    entries: Mutex<HashMap<station_core::SubscriberId, Entry>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected subscriber with an empty interest set
    /// (spec.md §3: "empty set is allowed — subscribes to nothing but
    /// receives non-batch broadcasts").
    pub fn connect(&self, subscriber: Box<dyn Subscriber>) -> station_core::SubscriberId {
        let id = station_core::SubscriberId::new();
        self.entries.lock().insert(id, Entry { subscriber, batch_ids: HashSet::new() });
        id
    }

    pub fn disconnect(&self, id: station_core::SubscriberId) {
        self.entries.lock().remove(&id);
    }

    pub fn subscribe(&self, id: station_core::SubscriberId, batch_ids: impl IntoIterator<Item = BatchId>) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.batch_ids.extend(batch_ids);
        }
    }

    pub fn unsubscribe(&self, id: station_core::SubscriberId, batch_ids: impl IntoIterator<Item = BatchId>) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            for batch_id in batch_ids {
                entry.batch_ids.remove(&batch_id);
            }
        }
    }

    pub fn subscriptions(&self, id: station_core::SubscriberId) -> HashSet<BatchId> {
        self.entries.lock().get(&id).map(|e| e.batch_ids.clone()).unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Deliver `frame` to every subscriber whose interest set contains
    /// `batch_id` (spec.md §8: "every subscriber whose set contains B
    /// receives it exactly once").
    pub fn broadcast(&self, batch_id: BatchId, frame: &OutboundFrame) {
        let targets: Vec<(station_core::SubscriberId, bool)> = self
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| (*id, entry.batch_ids.contains(&batch_id)))
            .collect();
        self.send_to(targets.into_iter().filter(|(_, interested)| *interested).map(|(id, _)| id), frame);
    }

    /// Deliver `frame` to every subscriber, batch-scoped interest sets
    /// notwithstanding (spec.md §4.I: "empty for the 'all' broadcasts").
    pub fn broadcast_all(&self, frame: &OutboundFrame) {
        let ids: Vec<station_core::SubscriberId> = self.entries.lock().keys().copied().collect();
        self.send_to(ids.into_iter(), frame);
    }

    fn send_to(&self, ids: impl Iterator<Item = station_core::SubscriberId>, frame: &OutboundFrame) {
        for id in ids {
            let sent = self.entries.lock().get(&id).map(|entry| entry.subscriber.send(frame));
            if let Some(Err(error)) = sent {
                warn!(%id, %error, "push send failed; subscriber stays registered");
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

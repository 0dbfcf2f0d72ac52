//! Offline sync queue data model (spec.md §4.G).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use station_core::QueueEntryId;

/// Backend call deferred because the backend was unreachable.
///
/// `payload` carries everything needed to replay the call: which endpoint,
/// and the JSON body that was going to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub status: QueueEntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEntryStatus {
    Pending,
    Failed,
    Acked,
}

impl QueueEntry {
    pub fn new(endpoint: impl Into<String>, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id: QueueEntryId::new(),
            endpoint: endpoint.into(),
            payload,
            created_at: now,
            attempts: 0,
            last_error: None,
            next_attempt_at: now,
            status: QueueEntryStatus::Pending,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueEntryStatus::Pending && self.next_attempt_at <= now
    }
}

/// Events appended to the durable log. The materialized [`crate::queue::OfflineQueue`]
/// is rebuilt by replaying these in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QueueEvent {
    Enqueued {
        entry: QueueEntry,
    },
    AttemptFailed {
        id: QueueEntryId,
        error: String,
        next_attempt_at: DateTime<Utc>,
        failed: bool,
    },
    Acked {
        id: QueueEntryId,
    },
}

/// Exponential backoff with jitter, grounded on spec.md §4.G's retry table.
pub fn backoff_after(attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let base_secs = 2u64.saturating_pow(attempts.min(6));
    let jitter_ms = rand::random::<u64>() % 1000;
    now + chrono::Duration::milliseconds((base_secs * 1000 + jitter_ms) as i64)
}

#[cfg(test)]
#[path = "queue_entry_tests.rs"]
mod tests;

//! In-memory materialization of the offline sync queue, rebuilt by replaying
//! [`crate::wal::Wal`] entries — mirrors the teacher's
//! `MaterializedState::apply_event` pattern, scoped to one event family.

use crate::queue_entry::{backoff_after, QueueEntry, QueueEntryStatus, QueueEvent};
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use station_core::QueueEntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error("unknown queue entry {0}")]
    UnknownEntry(QueueEntryId),
}

/// Default max-retries before an entry moves to the `Failed` sub-state.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Durable FIFO of deferred backend calls (spec.md §4.G).
///
/// Rows are never deleted by producers — only [`OfflineQueue::ack`] retires
/// an entry, removing it from the materialized table (the WAL keeps the full
/// history until the next [`Wal::compact`]).
pub struct OfflineQueue {
    wal: Wal,
    entries: HashMap<QueueEntryId, QueueEntry>,
    max_retries: u32,
}

impl OfflineQueue {
    pub fn open(path: &Path, max_retries: u32) -> Result<Self, StorageError> {
        let (wal, replayed) = Wal::open(path)?;
        let mut entries = HashMap::new();
        for wal_entry in replayed {
            apply(&mut entries, wal_entry.event);
        }
        Ok(Self {
            wal,
            entries,
            max_retries,
        })
    }

    /// Enqueue a deferred backend call, returning its assigned id.
    pub fn enqueue(
        &mut self,
        endpoint: impl Into<String>,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<QueueEntryId, StorageError> {
        let entry = QueueEntry::new(endpoint, payload, now);
        let id = entry.id;
        let event = QueueEvent::Enqueued { entry };
        self.wal.append(&event)?;
        apply(&mut self.entries, event);
        Ok(id)
    }

    /// Entries whose `next_attempt_at` has elapsed, oldest first.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<&QueueEntry> {
        let mut due: Vec<&QueueEntry> = self.entries.values().filter(|e| e.is_due(now)).collect();
        due.sort_by_key(|e| e.created_at);
        due
    }

    /// Record a failed drain attempt. Moves the entry to `Failed` once
    /// `attempts >= max_retries`.
    pub fn record_failure(
        &mut self,
        id: QueueEntryId,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let entry = self.entries.get(&id).ok_or(StorageError::UnknownEntry(id))?;
        let attempts = entry.attempts + 1;
        let failed = attempts >= self.max_retries;
        let next_attempt_at = backoff_after(attempts, now);
        let event = QueueEvent::AttemptFailed {
            id,
            error: error.into(),
            next_attempt_at,
            failed,
        };
        self.wal.append(&event)?;
        apply(&mut self.entries, event);
        Ok(())
    }

    /// Acknowledge a successfully drained entry, retiring it.
    pub fn ack(&mut self, id: QueueEntryId) -> Result<(), StorageError> {
        if !self.entries.contains_key(&id) {
            return Err(StorageError::UnknownEntry(id));
        }
        let event = QueueEvent::Acked { id };
        self.wal.append(&event)?;
        apply(&mut self.entries, event);
        Ok(())
    }

    pub fn count_pending(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.status == QueueEntryStatus::Pending)
            .count()
    }

    pub fn count_failed(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.status == QueueEntryStatus::Failed)
            .count()
    }

    pub fn get(&self, id: QueueEntryId) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    /// Discard acked entries from the durable log, keeping pending/failed
    /// history intact.
    pub fn compact(&mut self) -> Result<(), StorageError> {
        let keep: Vec<_> = self
            .entries
            .values()
            .cloned()
            .map(|entry| crate::wal::WalEntry {
                seq: 0,
                event: QueueEvent::Enqueued { entry },
            })
            .collect();
        self.wal.compact(&keep)?;
        Ok(())
    }
}

fn apply(entries: &mut HashMap<QueueEntryId, QueueEntry>, event: QueueEvent) {
    match event {
        QueueEvent::Enqueued { entry } => {
            entries.insert(entry.id, entry);
        }
        QueueEvent::AttemptFailed {
            id,
            error,
            next_attempt_at,
            failed,
        } => {
            if let Some(entry) = entries.get_mut(&id) {
                entry.attempts += 1;
                entry.last_error = Some(error);
                entry.next_attempt_at = next_attempt_at;
                if failed {
                    entry.status = QueueEntryStatus::Failed;
                }
            }
        }
        QueueEvent::Acked { id } => {
            entries.remove(&id);
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

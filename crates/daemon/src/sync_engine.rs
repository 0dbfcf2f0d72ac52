//! Sync engine (spec.md §4.G): drains the offline queue persisted by
//! workers, on a wakeup interval or on demand (`forceSync`).
//!
//! The offline queue is owned by whichever process enqueued the entry, but
//! "a central sync engine in the master also drains queue entries persisted
//! to the shared database" (spec.md §3 Ownership) — this engine opens the
//! same per-batch queue files the workers append to and replays due entries
//! against a master-owned backend client.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use station_backend::{BackendClient, BackendError, CompleteProcessRequest, StartProcessRequest};
use station_storage::{OfflineQueue, StorageError, DEFAULT_MAX_RETRIES};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("malformed queue entry payload for endpoint '{endpoint}': {source}")]
    MalformedPayload { endpoint: String, source: serde_json::Error },
}

#[derive(Deserialize)]
struct StartProcessPayload {
    wip_int_id: u64,
    request: StartProcessRequest,
}

#[derive(Deserialize)]
struct CompleteProcessPayload {
    wip_int_id: u64,
    process_id: u32,
    request: CompleteProcessRequest,
}

/// Drains every configured batch's offline queue against a shared backend
/// client. One `OfflineQueue` per batch id, opened from that batch's queue
/// file under `data_root/<batch_id>-queue.jsonl` — the same path
/// `station-worker` writes to.
pub struct SyncEngine {
    backend: BackendClient,
    queues: Mutex<HashMap<String, OfflineQueue>>,
    data_root: PathBuf,
}

impl SyncEngine {
    pub fn new(backend: BackendClient, data_root: PathBuf) -> Self {
        Self { backend, queues: Mutex::new(HashMap::new()), data_root }
    }

    fn queue_path(&self, batch_id: &str) -> PathBuf {
        self.data_root.join(batch_id).join(format!("{batch_id}-queue.jsonl"))
    }

    /// Drain every due entry in `batch_id`'s queue, oldest first, stopping
    /// at the first entry whose replay fails (preserves FIFO ordering —
    /// spec.md §8 "drains exactly those entries whose acknowledgement
    /// succeeds", and a queue is a single ordered stream per batch).
    pub async fn drain_batch(&self, batch_id: &str) -> Result<usize, SyncError> {
        let path = self.queue_path(batch_id);
        if !path.exists() {
            return Ok(0);
        }
        {
            let mut queues = self.queues.lock();
            if !queues.contains_key(batch_id) {
                let queue = OfflineQueue::open(&path, DEFAULT_MAX_RETRIES)?;
                queues.insert(batch_id.to_string(), queue);
            }
        }

        let due_ids: Vec<station_core::QueueEntryId> = {
            let mut queues = self.queues.lock();
            let queue = queues.get_mut(batch_id).expect("just inserted above");
            queue.due(Utc::now()).into_iter().map(|e| e.id).collect()
        };

        let mut drained = 0;
        for id in due_ids {
            let entry = {
                let queues = self.queues.lock();
                match queues.get(batch_id).and_then(|q| q.get(id)) {
                    Some(entry) => entry.clone(),
                    None => continue,
                }
            };

            let outcome = self.replay(&entry.endpoint, &entry.payload).await;
            let mut queues = self.queues.lock();
            let queue = queues.get_mut(batch_id).expect("queue present");
            match outcome {
                Ok(()) => {
                    queue.ack(id)?;
                    drained += 1;
                }
                Err(error) => {
                    warn!(batch_id, endpoint = %entry.endpoint, %error, "offline queue replay failed");
                    queue.record_failure(id, error.to_string(), Utc::now())?;
                    break;
                }
            }
        }
        if drained > 0 {
            info!(batch_id, drained, "drained offline queue entries");
        }
        Ok(drained)
    }

    /// `forceSync`: drain every batch id passed in, in order, summing the
    /// count of entries successfully acknowledged.
    pub async fn force_sync(&self, batch_ids: &[String]) -> usize {
        let mut total = 0;
        for batch_id in batch_ids {
            match self.drain_batch(batch_id).await {
                Ok(count) => total += count,
                Err(error) => warn!(batch_id, %error, "force_sync failed for batch"),
            }
        }
        total
    }

    async fn replay(&self, endpoint: &str, payload: &serde_json::Value) -> Result<(), BackendError> {
        match endpoint {
            "start_process" => {
                let parsed: StartProcessPayload = serde_json::from_value(payload.clone())
                    .map_err(|_| BackendError::Backend { code: "MALFORMED_PAYLOAD".into(), message: endpoint.to_string() })?;
                self.backend.start_process(parsed.wip_int_id, &parsed.request).await?;
                Ok(())
            }
            "complete_process" => {
                let parsed: CompleteProcessPayload = serde_json::from_value(payload.clone())
                    .map_err(|_| BackendError::Backend { code: "MALFORMED_PAYLOAD".into(), message: endpoint.to_string() })?;
                self.backend.complete_process(parsed.wip_int_id, parsed.process_id, &parsed.request).await?;
                Ok(())
            }
            other => {
                warn!(endpoint = other, "unknown offline queue endpoint; dropping replay attempt as failed");
                Err(BackendError::Backend { code: "UNKNOWN_ENDPOINT".into(), message: other.to_string() })
            }
        }
    }

    /// Background loop: drain every batch id in `batch_ids` every `interval`
    /// (spec.md §4.G "wakes every sync_interval (default 30s)").
    pub async fn run(&self, batch_ids: impl Fn() -> Vec<String>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.force_sync(&batch_ids()).await;
        }
    }
}

#[cfg(test)]
#[path = "sync_engine_tests.rs"]
mod tests;

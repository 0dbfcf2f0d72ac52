// SPDX-License-Identifier: MIT

//! Durable local state for the station control service: the offline sync
//! queue (spec.md §4.G) and the local execution history used to reconcile
//! results after a backend outage.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod execution_log;
pub mod queue;
pub mod queue_entry;
pub mod wal;

pub use execution_log::{ExecutionLog, ExecutionLogError, ExecutionLogRecord};
pub use queue::{OfflineQueue, StorageError, DEFAULT_MAX_RETRIES};
pub use queue_entry::{QueueEntry, QueueEntryStatus, QueueEvent};

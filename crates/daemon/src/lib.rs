// SPDX-License-Identifier: MIT

//! Master-process orchestration (spec.md §4.C, §4.E, §4.G, §4.I): the
//! per-batch IPC transport, the batch supervisor, the offline-queue sync
//! engine, the subscriber registry, and the event-emitter → outbound-frame
//! translation that ties the event bus to the push surface.
//!
//! This crate owns everything the master process does with a *running*
//! worker; the HTTP/WebSocket framing that exposes it is out of scope
//! (spec.md §1 Explicitly out of scope).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod frames;
pub mod ipc;
pub mod registry;
pub mod supervisor;
pub mod sync_engine;

pub use error::SupervisorError;
pub use ipc::{CommandChannel, WorkerHandle, WorkerSpawnConfig};
pub use registry::{Subscriber, SubscriberRegistry};
pub use supervisor::{BatchSupervisor, SupervisorPaths};
pub use sync_engine::{SyncEngine, SyncError};

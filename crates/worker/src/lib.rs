// SPDX-License-Identifier: MIT

//! Batch worker subprocess logic for the station control service (spec.md
//! §4.D): the command loop one worker process runs against a single
//! sequence instance and its hardware.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod callbacks;
mod error;
mod state;
mod worker;

pub use error::WorkerError;
pub use state::{LastRun, RunState, Stats, StepListEntry, WipContext, WorkerStatus};
pub use worker::{bootstrap, BootstrapOptions, Worker};

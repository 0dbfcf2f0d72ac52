// SPDX-License-Identifier: MIT

//! Runs the ordered steps of one [`station_core::Sequence`] instance against
//! a parameter snapshot: per-step timeout, retry, cleanup, and condition
//! handling, always finishing with a cleanup pass regardless of how the
//! regular steps ended.
//!
//! This is the one piece of the source's `sequence/executor.py` that the
//! redesign keeps as a freestanding component rather than folding into the
//! worker: `station-worker` owns IPC plumbing, `station-executor` only knows
//! how to run steps and report what happened.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod callbacks;
mod executor;

pub use callbacks::{ErrorCallback, ExecutorCallbacks, LogCallback, StepCompleteCallback, StepStartCallback};
pub use executor::{ExecutionError, SequenceExecutor, StopToken};

// SPDX-License-Identifier: MIT

//! Sequence package discovery and loading (spec.md §4.A).
//!
//! Per SPEC_FULL.md §4.A, the source system's dynamic module import is
//! replaced with a plugin ABI: a binary registers a [`SequenceFactory`] and
//! driver factories for every package it ships at startup, and this crate's
//! job shrinks to discovering manifests on disk and resolving entry points
//! against those registries.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod error;
mod loader;
mod registry;

pub use error::LoaderError;
pub use loader::PackageLoader;
pub use registry::{DriverFactory, DriverRegistry, SequenceRegistry};

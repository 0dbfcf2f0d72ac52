// SPDX-License-Identifier: MIT

//! Concrete [`station_core::HardwareDriver`] implementations: a simulated
//! instrument for stations with no physical hardware attached, and two real
//! transports (TCP, serial) sharing a line-oriented request/response
//! protocol.
//!
//! A manifest's hardware block names a driver by `(module, class)`; a
//! binary wires those names to the constructors here through
//! `station-loader`'s `DriverRegistry`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod mock;
pub mod serial;
pub mod stream;
pub mod tcp;

pub use mock::MockDriver;
pub use serial::{SerialDriver, SerialDriverConfig};
pub use station_core::SimulationConfig;
pub use stream::{LineStream, StreamDriver};
pub use tcp::{TcpDriver, TcpDriverConfig};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeDriver, RecordedCall};

//! The `HardwareDriver` seam: the only interface the executor and worker
//! see for a physical instrument. Concrete drivers live in `station-adapters`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Errors raised by a driver's connect/disconnect/call methods.
///
/// Mirrors the source's `DriverError`/`ConnectionError`/`CommunicationError`
/// hierarchy (station_service/sequence/exceptions.py) as a flat enum, since
/// Rust has no use for the subclass relationship — call sites match on the
/// variant they care about.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum DriverError {
    #[error("driver '{driver}' connection error: {message}")]
    Connection { driver: String, message: String },

    #[error("driver '{driver}' communication error: {message}")]
    Communication { driver: String, message: String },

    #[error("driver '{driver}' has no method '{method}'")]
    UnknownMethod { driver: String, method: String },
}

/// A hardware driver: a connectable object with arbitrary callable methods.
///
/// spec.md §1: "the core only sees a driver as an object with
/// `connect`/`disconnect` plus arbitrary callable methods" — `call` is that
/// catch-all, used both by manual control (§4.D `MANUAL_CONTROL`) and by a
/// sequence's own step bodies.
#[async_trait]
pub trait HardwareDriver: Send + Sync {
    /// Human-readable driver name, used in logs and hardware-status replies.
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<(), DriverError>;

    async fn disconnect(&self) -> Result<(), DriverError>;

    /// Invoke an arbitrary named method with JSON-encoded parameters.
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, DriverError>;

    /// Whether the driver currently believes itself connected. Used for
    /// `GET_STATUS`'s optional hardware-status payload.
    fn is_connected(&self) -> bool;
}

pub type DriverHandle = Arc<dyn HardwareDriver>;
pub type HardwareMap = std::collections::HashMap<String, DriverHandle>;

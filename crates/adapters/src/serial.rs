//! Serial-port instrument driver (`driver: serial` in a manifest's hardware
//! definition).
//!
//! Shares [`crate::stream`]'s line protocol with [`crate::tcp::TcpDriver`];
//! what differs is how the transport is opened. No serial-port crate is
//! wired up here — connecting a real port is deliberately left to the
//! binary that configures this driver for a given deployment, since the
//! concrete transport depends on what's physically attached to the host.
//! `SerialDriver::attach` lets a caller hand in any [`crate::stream::LineStream`]
//! (e.g. a `tokio_serial`-backed stream, once a binary depends on one) and get
//! the same request/response framing `TcpDriver` gets for free. The stream is
//! boxed rather than a type parameter on `SerialDriver` itself, since the
//! driver registry constructs one from config alone, long before any stream
//! exists to name a concrete type.

use crate::stream::{LineStream, StreamDriver};
use async_trait::async_trait;
use serde::Deserialize;
use station_core::{DriverError, HardwareDriver};

#[derive(Debug, Clone, Deserialize)]
pub struct SerialDriverConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    9600
}

/// A serial-line instrument driver over a boxed [`LineStream`].
pub struct SerialDriver {
    config: SerialDriverConfig,
    inner: StreamDriver<Box<dyn LineStream>>,
}

impl SerialDriver {
    pub fn new(name: impl Into<String>, config: SerialDriverConfig) -> Self {
        Self { inner: StreamDriver::new(name), config }
    }

    pub fn port(&self) -> &str {
        &self.config.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    /// Hand the driver an already-open port. Called by whatever binary owns
    /// the concrete serial transport for its host platform.
    pub async fn attach(&self, stream: impl LineStream + 'static) {
        self.inner.attach(Box::new(stream)).await;
    }
}

#[async_trait]
impl HardwareDriver for SerialDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn connect(&self) -> Result<(), DriverError> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.inner.disconnect().await
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, DriverError> {
        self.inner.call(method, params).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

#[cfg(test)]
#[path = "serial_tests.rs"]
mod tests;

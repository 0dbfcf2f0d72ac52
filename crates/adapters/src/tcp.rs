//! TCP-connected instrument driver (`driver: tcp` in a manifest's hardware
//! definition), speaking the line protocol in [`crate::stream`].

use crate::stream::StreamDriver;
use async_trait::async_trait;
use serde::Deserialize;
use station_core::{DriverError, HardwareDriver};
use tokio::net::TcpStream;

#[derive(Debug, Clone, Deserialize)]
pub struct TcpDriverConfig {
    pub host: String,
    pub port: u16,
}

pub struct TcpDriver {
    config: TcpDriverConfig,
    inner: StreamDriver<TcpStream>,
}

impl TcpDriver {
    pub fn new(name: impl Into<String>, config: TcpDriverConfig) -> Self {
        Self { inner: StreamDriver::new(name), config }
    }
}

#[async_trait]
impl HardwareDriver for TcpDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn connect(&self) -> Result<(), DriverError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr).await.map_err(|e| DriverError::Connection {
            driver: self.inner.name().to_string(),
            message: format!("connecting to {addr}: {e}"),
        })?;
        self.inner.attach(stream).await;
        Ok(())
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
#[path = "tcp_tests.rs"]
mod tests;

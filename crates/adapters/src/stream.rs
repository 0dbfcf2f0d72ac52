//! Line-oriented instrument protocol shared by [`crate::tcp::TcpDriver`] and
//! [`crate::serial::SerialDriver`]: one newline-terminated JSON request per
//! call, one newline-terminated JSON response.
//!
//! `call(method, params)` writes `{"method": ..., "params": ...}\n` and reads
//! back one line, parsed as the raw JSON result. Most bench instruments that
//! speak a line protocol (SCPI-over-socket, simple serial command sets) fit
//! this shape; instruments that don't can still implement [`HardwareDriver`]
//! directly without going through this helper.

use async_trait::async_trait;
use station_core::DriverError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// A duplex byte stream a [`StreamDriver`] can read lines from and write
/// lines to. Implemented for any Tokio-async read/write pair (TCP sockets,
/// duplex pipes in tests).
pub trait LineStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}
impl<T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> LineStream for T {}

/// A [`station_core::HardwareDriver`] over a line-oriented transport.
///
/// Owns the transport behind a `tokio::sync::Mutex` since request/response
/// exchanges must not interleave on the same connection.
pub struct StreamDriver<S: LineStream> {
    name: String,
    stream: Mutex<Option<BufReader<S>>>,
}

impl<S: LineStream> StreamDriver<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), stream: Mutex::new(None) }
    }

    pub async fn attach(&self, stream: S) {
        *self.stream.lock().await = Some(BufReader::new(stream));
    }

    fn comm_error(&self, message: impl Into<String>) -> DriverError {
        DriverError::Communication { driver: self.name.clone(), message: message.into() }
    }
}

#[async_trait]
impl<S: LineStream + 'static> station_core::HardwareDriver for StreamDriver<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DriverError> {
        if self.stream.lock().await.is_some() {
            Ok(())
        } else {
            Err(DriverError::Connection {
                driver: self.name.clone(),
                message: "no transport attached".into(),
            })
        }
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        *self.stream.lock().await = None;
        Ok(())
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, DriverError> {
        let mut guard = self.stream.lock().await;
        let reader = guard.as_mut().ok_or_else(|| DriverError::Connection {
            driver: self.name.clone(),
            message: "not connected".into(),
        })?;

        let request = serde_json::json!({ "method": method, "params": params }).to_string();
        reader
            .get_mut()
            .write_all(format!("{request}\n").as_bytes())
            .await
            .map_err(|e| self.comm_error(e.to_string()))?;

        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await.map_err(|e| self.comm_error(e.to_string()))?;
        if bytes_read == 0 {
            return Err(self.comm_error("connection closed by instrument"));
        }
        serde_json::from_str(line.trim()).map_err(|e| self.comm_error(format!("malformed response: {e}")))
    }

    fn is_connected(&self) -> bool {
        // Checking without awaiting the lock would race; callers that need
        // a synchronous best-effort read use `try_lock`.
        self.stream.try_lock().map(|g| g.is_some()).unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;

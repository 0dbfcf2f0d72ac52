//! Simulated hardware driver (spec.md §3 `simulation` config), used when a
//! station runs without physical instruments attached — demo stations,
//! integration tests, and CI.
//!
//! Grounded on `station.yaml`'s `simulation` block: a global delay/failure
//! range with optional per-process overrides, keyed by the batch's
//! `process_id`. `MockDriver` is registered against manifests that declare
//! `driver: mock`.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use station_core::{DriverError, HardwareDriver, SimulationConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One simulated hardware driver instance, bound to a hardware id and,
/// optionally, the process id whose per-process simulation overrides apply.
pub struct MockDriver {
    name: String,
    config: SimulationConfig,
    process_id: Option<u32>,
    connected: AtomicBool,
    /// Last value returned per measurement key, so repeated calls to the
    /// same method drift rather than jump — closer to a real instrument.
    last_values: Mutex<std::collections::HashMap<String, f64>>,
}

impl MockDriver {
    pub fn new(name: impl Into<String>, config: SimulationConfig, process_id: Option<u32>) -> Self {
        Self {
            name: name.into(),
            config,
            process_id,
            connected: AtomicBool::new(false),
            last_values: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn process_config(&self) -> Option<&station_core::SimulationProcessConfig> {
        self.process_id.and_then(|id| self.config.processes.get(&id))
    }

    fn failure_rate(&self) -> f64 {
        self.process_config()
            .and_then(|p| p.failure_rate)
            .unwrap_or(self.config.failure_rate)
    }

    async fn simulated_delay(&self) {
        let secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.config.min_delay..=self.config.max_delay.max(self.config.min_delay))
        };
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    fn roll_failure(&self) -> bool {
        rand::thread_rng().gen_bool(self.failure_rate().clamp(0.0, 1.0))
    }

    fn measurement_value(&self, key: &str) -> Option<serde_json::Value> {
        let measurement = self.process_config()?.measurements.get(key)?;
        let mut rng = rand::thread_rng();
        let base = rng.gen_range(measurement.min..=measurement.max);
        let noise = rng.gen_range(-measurement.noise..=measurement.noise) * (measurement.max - measurement.min);
        let value = (base + noise).clamp(measurement.min, measurement.max);
        self.last_values.lock().insert(key.to_string(), value);
        Some(serde_json::json!(value))
    }
}

#[async_trait]
impl HardwareDriver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DriverError> {
        tokio::time::sleep(Duration::from_secs_f64(self.config.connection_delay)).await;
        if self.roll_failure() {
            return Err(DriverError::Connection {
                driver: self.name.clone(),
                message: "simulated connection failure".into(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, DriverError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DriverError::Communication {
                driver: self.name.clone(),
                message: "not connected".into(),
            });
        }
        self.simulated_delay().await;
        if self.roll_failure() {
            return Err(DriverError::Communication {
                driver: self.name.clone(),
                message: format!("simulated failure calling '{method}'"),
            });
        }
        if let Some(value) = self.measurement_value(method) {
            return Ok(value);
        }
        Ok(params)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;

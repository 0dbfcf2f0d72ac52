//! Process-wide plugin registries, replacing the source system's dynamic
//! module import (spec.md §9 REDESIGN FLAGS: "dynamic module import of
//! sequence packages -> plugin ABI").
//!
//! A binary links in the sequences and drivers it ships with and registers a
//! factory for each `(module, class)` pair at startup, the same way the
//! teacher's adapter selection links in a fixed set of adapters rather than
//! discovering them at runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use station_core::{DriverError, DriverHandle, SequenceFactory};

/// Constructs a driver instance from its per-batch config value.
pub type DriverFactory = std::sync::Arc<
    dyn Fn(serde_json::Value) -> Result<DriverHandle, DriverError> + Send + Sync,
>;

fn registry_key(module: &str, class: &str) -> String {
    format!("{module}::{class}")
}

/// Registered [`SequenceFactory`]s, keyed by `(module, class)` entry point.
#[derive(Default)]
pub struct SequenceRegistry {
    factories: Mutex<HashMap<String, SequenceFactory>>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: &str, class: &str, factory: SequenceFactory) {
        self.factories.lock().insert(registry_key(module, class), factory);
    }

    pub fn get(&self, module: &str, class: &str) -> Option<SequenceFactory> {
        self.factories.lock().get(&registry_key(module, class)).cloned()
    }
}

/// Registered [`DriverFactory`]s, keyed by `(driver module, class)`.
#[derive(Default)]
pub struct DriverRegistry {
    factories: Mutex<HashMap<String, DriverFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: &str, class: &str, factory: DriverFactory) {
        self.factories.lock().insert(registry_key(module, class), factory);
    }

    pub fn get(&self, module: &str, class: &str) -> Option<DriverFactory> {
        self.factories.lock().get(&registry_key(module, class)).cloned()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

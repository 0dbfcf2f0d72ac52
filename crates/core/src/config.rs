//! Station configuration (`station.yaml`), mirroring
//! station_service/models/config.py's Pydantic config tree.
//!
//! HTTP routing and log configuration are explicitly out of scope (spec.md
//! Non-goals), but the config file still carries their settings through —
//! a daemon reading `station.yaml` has to round-trip fields it doesn't act
//! on, and the backend/batch sections below are squarely in scope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
    #[serde(default = "default_wildcard")]
    pub allow_methods: Vec<String>,
    #[serde(default = "default_wildcard")]
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allow_credentials: true,
            allow_methods: default_wildcard(),
            allow_headers: default_wildcard(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into(), "http://localhost:5173".into()]
}

fn default_wildcard() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

/// HTTP server settings. Parsed and round-tripped; routing itself is out of
/// scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,
    #[serde(default)]
    pub station_id: String,
    #[serde(default)]
    pub equipment_id: Option<u64>,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            sync_interval: default_sync_interval(),
            station_id: String::new(),
            equipment_id: None,
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_sync_interval() -> u64 {
    30
}

fn default_timeout() -> f64 {
    30.0
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMeasurementConfig {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_noise")]
    pub noise: f64,
}

fn default_noise() -> f64 {
    0.02
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationProcessConfig {
    #[serde(default)]
    pub measurements: BTreeMap<String, SimulationMeasurementConfig>,
    #[serde(default)]
    pub failure_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_delay")]
    pub min_delay: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay: f64,
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
    #[serde(default = "default_connection_delay")]
    pub connection_delay: f64,
    /// Process-specific overrides, keyed by process id (1-8).
    #[serde(default)]
    pub processes: BTreeMap<u32, SimulationProcessConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            failure_rate: default_failure_rate(),
            connection_delay: default_connection_delay(),
            processes: BTreeMap::new(),
        }
    }
}

fn default_min_delay() -> f64 {
    0.1
}
fn default_max_delay() -> f64 {
    0.5
}
fn default_failure_rate() -> f64 {
    0.02
}
fn default_connection_delay() -> f64 {
    0.3
}

/// A single batch definition from `station.yaml`'s `batches` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub id: String,
    pub name: String,
    pub sequence_package: String,
    #[serde(default)]
    pub hardware: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub auto_start: bool,
    /// Associated WIP process id (1-8), if this batch drives backend sync.
    #[serde(default)]
    pub process_id: Option<u32>,
}

/// Round-tripped, not acted on here: log emission itself stays enabled, but
/// how it's configured (level/rotation) is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_max_size")]
    pub max_size: String,
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            max_size: default_max_size(),
            backup_count: default_backup_count(),
        }
    }
}

fn default_log_level() -> String {
    "INFO".into()
}
fn default_log_file() -> String {
    "data/logs/station.log".into()
}
fn default_max_size() -> String {
    "10MB".into()
}
fn default_backup_count() -> u32 {
    5
}

/// Complete station configuration (`station.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub station: StationInfo,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub batches: Vec<BatchConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl StationConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigIoError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&text)?)
    }

    /// Rewrite `path` atomically: write the new contents to a sibling temp
    /// file, fsync it, keep the previous contents at `<path>.bak`, then
    /// rename the temp file into place. A crash at any point leaves either
    /// the old file or the new one intact, never a half-written one.
    pub fn save(&self, path: &Path) -> Result<(), ConfigIoError> {
        let yaml = self.to_yaml()?;
        write_atomic(path, yaml.as_bytes())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigIoError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Write `contents` to `path`, keeping a `.bak` copy of whatever was there
/// before. Shared by station config saves and manifest `updateManifest`
/// rewrites.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConfigIoError> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("yaml")
    ));
    {
        let mut tmp_file = std::fs::File::create(&tmp_path)?;
        use std::io::Write;
        tmp_file.write_all(contents)?;
        tmp_file.sync_all()?;
    }
    if path.exists() {
        let bak_path = path.with_extension(format!(
            "{}.bak",
            path.extension().and_then(|e| e.to_str()).unwrap_or("yaml")
        ));
        std::fs::copy(path, &bak_path)?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

//! Sequence package manifest schema (`manifest.yaml`).
//!
//! Grounded on station_service/sequence/manifest.py's Pydantic models;
//! validation rules are carried over field-for-field, re-expressed with
//! `thiserror` instead of Pydantic's raised `ValueError`s.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("invalid sequence name '{0}': must be a valid identifier")]
    InvalidName(String),

    #[error("invalid version '{0}': must follow X.Y.Z pattern (e.g. '1.0.0')")]
    InvalidVersion(String),

    #[error("invalid module path '{path}': '{part}' is not a valid identifier")]
    InvalidModulePath { path: String, part: String },

    #[error("invalid class name '{0}': must be a valid identifier")]
    InvalidClassName(String),

    #[error(
        "default value for parameter '{name}' does not match declared type {expected:?}: {value}"
    )]
    DefaultTypeMismatch {
        name: String,
        expected: ParameterType,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFieldSchema {
    #[serde(rename = "type")]
    pub field_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareDefinition {
    pub display_name: String,
    pub driver: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_schema: Option<BTreeMap<String, ConfigFieldSchema>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub display_name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl ParameterDefinition {
    fn validate(&self, name: &str) -> Result<(), ManifestError> {
        let Some(default) = &self.default else {
            return Ok(());
        };
        let ok = match self.param_type {
            ParameterType::String => default.is_string(),
            ParameterType::Integer => default.is_i64() || default.is_u64(),
            ParameterType::Float => default.is_number(),
            ParameterType::Boolean => default.is_boolean(),
        };
        if ok {
            Ok(())
        } else {
            Err(ManifestError::DefaultTypeMismatch {
                name: name.to_string(),
                expected: self.param_type,
                value: default.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub module: String,
    #[serde(rename = "class")]
    pub class_name: String,
}

impl EntryPoint {
    fn validate(&self) -> Result<(), ManifestError> {
        for part in self.module.split('.') {
            if !is_identifier(part) {
                return Err(ManifestError::InvalidModulePath {
                    path: self.module.clone(),
                    part: part.to_string(),
                });
            }
        }
        if !is_identifier(&self.class_name) {
            return Err(ManifestError::InvalidClassName(self.class_name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    #[serde(default)]
    pub python: Vec<String>,
}

/// Persisted `order`/`timeout` override for one step, applied on top of the
/// value the sequence implementation declares in its `StepMeta`.
///
/// Written by `station-loader`'s `updateManifest`; the executor never reads
/// this directly, the loader folds it into the `StepMeta` list it hands the
/// executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOverride {
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

/// Complete manifest for a sequence package (spec.md's `SequenceManifest`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub entry_point: EntryPoint,
    #[serde(default)]
    pub hardware: BTreeMap<String, HardwareDefinition>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterDefinition>,
    #[serde(default)]
    pub dependencies: DependencySpec,
    /// Operator-applied `order`/`timeout` overrides, keyed by step name.
    #[serde(default)]
    pub step_overrides: BTreeMap<String, StepOverride>,
}

impl SequenceManifest {
    /// Parse and validate a manifest from its YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ManifestParseError> {
        let manifest: Self = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if !is_identifier(&self.name) {
            return Err(ManifestError::InvalidName(self.name.clone()));
        }
        if !version_pattern().is_match(&self.version) {
            return Err(ManifestError::InvalidVersion(self.version.clone()));
        }
        self.entry_point.validate()?;
        for (name, param) in &self.parameters {
            param.validate(name)?;
        }
        Ok(())
    }

    pub fn hardware_names(&self) -> Vec<&str> {
        self.hardware.keys().map(String::as_str).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    pub fn required_packages(&self) -> Vec<String> {
        self.dependencies.python.clone()
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Bump the patch component of `version` (`X.Y.Z` -> `X.Y.(Z+1)`).
    ///
    /// Panics only if `version` already failed [`SequenceManifest::validate`],
    /// which callers are required to have run first (manifests are always
    /// validated on load).
    pub fn bump_patch_version(&mut self) {
        let mut parts = self.version.splitn(3, '.');
        let major = parts.next().unwrap_or("0");
        let minor = parts.next().unwrap_or("0");
        let patch: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        self.version = format!("{major}.{minor}.{}", patch + 1);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestParseError {
    #[error("invalid manifest yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Validation(#[from] ManifestError),
}

fn version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("static pattern is valid"))
}

/// Whether `s` is a valid bare identifier: starts with a letter or
/// underscore, followed by letters, digits, or underscores.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;

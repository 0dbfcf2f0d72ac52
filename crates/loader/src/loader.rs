//! Sequence package discovery, manifest loading, and manifest rewriting
//! (spec.md §4.A).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use station_core::{SequenceManifest, StepOverride};
use tracing::warn;

use crate::error::LoaderError;
use crate::registry::{DriverFactory, DriverRegistry, SequenceRegistry};

const MANIFEST_FILE: &str = "manifest.yaml";

/// Loads sequence packages from a directory tree, caching parsed manifests
/// by package name and resolving entry points/drivers through the
/// process-wide [`SequenceRegistry`]/[`DriverRegistry`].
pub struct PackageLoader {
    root: PathBuf,
    sequences: SequenceRegistry,
    drivers: DriverRegistry,
    manifests: Mutex<HashMap<String, SequenceManifest>>,
    /// Package name -> directory, populated by `discover_packages` and by
    /// any direct `load_package` call.
    directories: Mutex<HashMap<String, PathBuf>>,
}

impl PackageLoader {
    pub fn new(root: impl Into<PathBuf>, sequences: SequenceRegistry, drivers: DriverRegistry) -> Self {
        Self {
            root: root.into(),
            sequences,
            drivers,
            manifests: Mutex::new(HashMap::new()),
            directories: Mutex::new(HashMap::new()),
        }
    }

    pub fn sequences(&self) -> &SequenceRegistry {
        &self.sequences
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Scan `root` for package directories, returning the declared package
    /// names (from each manifest's `name` field, not the directory name).
    ///
    /// Non-directories and hidden entries (names starting with `.`) are
    /// skipped. Unreadable or unparsable manifests are logged and skipped —
    /// discovery never fails outright because one package is broken.
    /// Two directories declaring the same manifest name is logged as a
    /// conflict; the later one (in directory-iteration order) wins.
    pub fn discover_packages(&self) -> Result<Vec<String>, LoaderError> {
        let mut found: HashMap<String, PathBuf> = HashMap::new();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true);
            if is_hidden || !path.is_dir() {
                continue;
            }
            let manifest_path = path.join(MANIFEST_FILE);
            let text = match std::fs::read_to_string(&manifest_path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %manifest_path.display(), error = %e, "skipping package with unreadable manifest");
                    continue;
                }
            };
            let manifest = match SequenceManifest::from_yaml(&text) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %manifest_path.display(), error = %e, "skipping package with invalid manifest");
                    continue;
                }
            };
            if let Some(previous) = found.get(&manifest.name) {
                warn!(
                    name = %manifest.name,
                    previous = %previous.display(),
                    current = %path.display(),
                    "duplicate package name; later directory wins"
                );
            }
            found.insert(manifest.name.clone(), path);
        }
        let mut names: Vec<String> = found.keys().cloned().collect();
        names.sort();
        *self.directories.lock() = found;
        Ok(names)
    }

    fn directory_for(&self, name: &str) -> PathBuf {
        self.directories
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.root.join(name))
    }

    /// Load and validate `name`'s manifest, caching the result.
    pub fn load_package(&self, name: &str) -> Result<SequenceManifest, LoaderError> {
        if let Some(cached) = self.manifests.lock().get(name) {
            return Ok(cached.clone());
        }
        let dir = self.directory_for(name);
        let manifest = self.read_manifest(name, &dir)?;
        self.manifests.lock().insert(name.to_string(), manifest.clone());
        self.directories.lock().insert(name.to_string(), dir);
        Ok(manifest)
    }

    fn read_manifest(&self, name: &str, dir: &Path) -> Result<SequenceManifest, LoaderError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&manifest_path).map_err(|source| LoaderError::ManifestIo {
            package: name.to_string(),
            source,
        })?;
        SequenceManifest::from_yaml(&text).map_err(|source| LoaderError::ManifestParse {
            package: name.to_string(),
            source,
        })
    }

    /// Resolve `manifest`'s entry point to a constructor-capable factory.
    pub fn load_sequence_class(
        &self,
        manifest: &SequenceManifest,
    ) -> Result<station_core::SequenceFactory, LoaderError> {
        self.sequences
            .get(&manifest.entry_point.module, &manifest.entry_point.class_name)
            .ok_or_else(|| LoaderError::UnknownSequenceClass {
                module: manifest.entry_point.module.clone(),
                class: manifest.entry_point.class_name.clone(),
            })
    }

    /// Resolve every hardware definition in `manifest` to a driver factory.
    ///
    /// A missing driver only logs a warning — the hardware id is simply
    /// absent from the returned map, matching spec.md §4.A's edge case
    /// ("missing driver modules raise a warning but do not fail the load").
    pub fn load_hardware_drivers(&self, manifest: &SequenceManifest) -> HashMap<String, DriverFactory> {
        let mut out = HashMap::new();
        for (hardware_id, def) in &manifest.hardware {
            match self.drivers.get(&def.driver, &def.class_name) {
                Some(factory) => {
                    out.insert(hardware_id.clone(), factory);
                }
                None => {
                    warn!(
                        hardware_id,
                        driver = %def.driver,
                        class = %def.class_name,
                        "no driver registered for hardware definition; omitting from hardware map"
                    );
                }
            }
        }
        out
    }

    /// Rewrite `name`'s manifest with parameter default overrides and/or
    /// step `order`/`timeout` overrides, bumping the patch version. Does not
    /// touch any source file.
    pub fn update_manifest(
        &self,
        name: &str,
        parameter_updates: Option<HashMap<String, serde_json::Value>>,
        step_updates: Option<HashMap<String, StepOverride>>,
    ) -> Result<SequenceManifest, LoaderError> {
        let mut manifest = self.load_package(name)?;

        if let Some(updates) = parameter_updates {
            for (param_name, value) in updates {
                if let Some(param) = manifest.parameters.get_mut(&param_name) {
                    param.default = Some(value);
                }
            }
        }
        if let Some(updates) = step_updates {
            for (step_name, step_override) in updates {
                manifest.step_overrides.insert(step_name, step_override);
            }
        }
        manifest.bump_patch_version();
        manifest.validate()?;

        let dir = self.directory_for(name);
        let manifest_path = dir.join(MANIFEST_FILE);
        let yaml = manifest.to_yaml().map_err(|source| LoaderError::ManifestParse {
            package: name.to_string(),
            source: source.into(),
        })?;
        station_core::config::write_atomic(&manifest_path, yaml.as_bytes())?;

        self.manifests.lock().insert(name.to_string(), manifest.clone());
        Ok(manifest)
    }

    /// Invalidate every cached manifest. Registries are untouched — they are
    /// process-wide plugin tables, not caches.
    pub fn clear_cache(&self) {
        self.manifests.lock().clear();
        self.directories.lock().clear();
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

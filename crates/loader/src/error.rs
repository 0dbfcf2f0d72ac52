//! Errors from discovering, loading, or rewriting sequence packages.

use station_core::{ManifestError, ManifestParseError};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("package '{0}' not found")]
    PackageNotFound(String),

    #[error("manifest io error for package '{package}': {source}")]
    ManifestIo { package: String, source: io::Error },

    #[error("manifest parse error for package '{package}': {source}")]
    ManifestParse {
        package: String,
        source: ManifestParseError,
    },

    #[error("manifest rewrite rejected the update: {0}")]
    InvalidUpdate(#[from] ManifestError),

    #[error("no sequence factory registered for entry point {module}.{class}")]
    UnknownSequenceClass { module: String, class: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("config write error: {0}")]
    Config(#[from] station_core::ConfigIoError),
}

//! Error taxonomy for the backend client (spec.md §4.H, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("WIP not found")]
    WipNotFound,
    #[error("prerequisite not met: process {required} must complete first")]
    PrerequisiteNotMet { required: u32 },
    #[error("invalid WIP status")]
    InvalidWipStatus,
    #[error("duplicate pass")]
    DuplicatePass,
    #[error("login failed")]
    LoginFailed,
    #[error("invalid token")]
    InvalidToken,
    #[error("backend error {code}: {message}")]
    Backend { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl BackendError {
    /// True for transport/5xx failures that should be queued offline rather
    /// than surfaced as a business-rule rejection (spec.md §7).
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transport(_) | BackendError::Backend { .. })
    }
}

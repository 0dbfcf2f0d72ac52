//! Error taxonomy for the batch supervisor (spec.md §4.E, §7).

use station_core::BatchId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("unknown batch '{0}'")]
    UnknownBatch(BatchId),

    #[error("batch '{0}' is already running")]
    AlreadyRunning(BatchId),

    #[error("batch '{0}' is not running")]
    NotRunning(BatchId),

    #[error("batch '{0}' is running; stop it before removing its config")]
    BatchRunningConfigLocked(BatchId),

    #[error("worker not connected")]
    WorkerNotConnected,

    #[error(transparent)]
    Protocol(#[from] station_wire::ProtocolError),

    #[error("worker returned an error: {0}")]
    WorkerError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] station_core::ConfigIoError),

    #[error(transparent)]
    Loader(#[from] station_loader::LoaderError),
}

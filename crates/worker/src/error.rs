//! Error taxonomy for the batch worker (spec.md §4.D, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("sequence already running")]
    AlreadyRunning,

    #[error("sequence not running")]
    NotRunning,

    #[error("no hardware registered for '{0}'")]
    UnknownHardware(String),

    #[error(transparent)]
    Driver(#[from] station_core::DriverError),

    #[error(transparent)]
    Backend(#[from] station_backend::BackendError),

    #[error(transparent)]
    Storage(#[from] station_storage::StorageError),

    #[error(transparent)]
    ExecutionLog(#[from] station_storage::ExecutionLogError),

    #[error(transparent)]
    Loader(#[from] station_loader::LoaderError),
}

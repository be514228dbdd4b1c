//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Executor failed: {0}")]
    ExecutorFailed(String),

    #[error("Registry failed: {0}")]
    RegistryFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] hlscast_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] hlscast_queue::QueueError),

    #[error("Record error: {0}")]
    Record(#[from] hlscast_models::RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn executor_failed(msg: impl Into<String>) -> Self {
        Self::ExecutorFailed(msg.into())
    }

    pub fn registry_failed(msg: impl Into<String>) -> Self {
        Self::RegistryFailed(msg.into())
    }
}

//! Storage provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur talking to the storage provider.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure provider client: {0}")]
    ConfigError(String),

    #[error("Failed to store file (code: {status})")]
    StoreFailed { status: u16 },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Could not find provider handle in {0}")]
    HandleNotFound(String),

    #[error("Encountered error while converting {url} to HLS: {message}")]
    ConversionFailed { message: String, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn handle_not_found(url: impl Into<String>) -> Self {
        Self::HandleNotFound(url.into())
    }

    pub fn conversion_failed(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ConversionFailed {
            message: message.into(),
            url: url.into(),
        }
    }
}

//! Remote store error types.

use thiserror::Error;

/// Result type for remote store operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur talking to the remote store.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("invalid metadata for key {key}: {reason}")]
    Metadata { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

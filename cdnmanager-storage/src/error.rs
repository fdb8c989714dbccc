//! Local index error types.

use thiserror::Error;

/// Result type for local index operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the local index.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: String, reason: String },

    #[error("blocking task failed: {0}")]
    Task(String),
}

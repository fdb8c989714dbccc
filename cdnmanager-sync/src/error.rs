//! Sync error types.
//!
//! Every mutation failure states which store failed and whether the other
//! store changed, so a caller can tell total failure from a partial one.

use cdnmanager_types::{EntryId, ValidationError};
use std::fmt;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// The dual-store mutation a partial failure interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Insert => "insert",
            Operation::Delete => "delete",
        })
    }
}

/// Remote ids that were listed but could not be decoded into entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableKeys(pub Vec<EntryId>);

impl fmt::Display for UnreadableKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote write of {id} failed: {reason}; local index unchanged")]
    RemoteWrite { id: EntryId, reason: String },

    #[error("remote delete of {id} failed: {reason}; local index unchanged")]
    RemoteDelete { id: EntryId, reason: String },

    #[error(
        "{operation} of {id} committed to the remote store but the local index failed: {reason}; stores now disagree"
    )]
    PartialSync {
        id: EntryId,
        operation: Operation,
        reason: String,
    },

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("remote store holds keys with unreadable metadata: {0}")]
    UnreadableRemote(UnreadableKeys),

    #[error("local index update failed: {0}; remote store unchanged")]
    LocalIndex(String),

    #[error("another mutation of {0} is still in flight")]
    MutationInFlight(EntryId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("bulk template line {line}: {reason}")]
    Template { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True when the remote store changed but the local index did not follow.
    pub fn is_partial(&self) -> bool {
        matches!(self, SyncError::PartialSync { .. })
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            SyncError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

//! Wire types for the KV REST API and the remote store seam.

use cdnmanager_types::{Entry, EntryId};
use serde::{Deserialize, Serialize};

/// Standard response wrapper returned by every JSON endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

impl<T> ApiEnvelope<T> {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Pagination info on key listings. An empty cursor marks the last page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One key from a listing, with its metadata but without its value.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyListing {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// One item of a bulk write.
#[derive(Debug, Clone, Serialize)]
pub struct KvPair<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub metadata: serde_json::Value,
}

/// Result body of a bulk write. A `success: true` envelope can still carry
/// keys the store refused.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkWriteResult {
    #[serde(default)]
    pub successful_key_count: u64,
    #[serde(default)]
    pub unsuccessful_keys: Vec<String>,
}

/// Outcome of a remote write: the API's success flag and its error list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

impl WriteOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
        }
    }

    /// Errors joined for display, or a placeholder when the API gave none.
    pub fn reason(&self) -> String {
        if self.errors.is_empty() {
            "remote store reported failure".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// One page of the remote catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemotePage {
    pub entries: Vec<Entry>,
    /// Listed ids whose metadata is absent or cannot be decoded. They exist
    /// remotely but cannot be turned into entries.
    pub unreadable: Vec<EntryId>,
    /// `None` on the last page.
    pub next_cursor: Option<String>,
}

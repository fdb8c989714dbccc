//! The remote store seam.

use crate::error::CloudResult;
use crate::types::{RemotePage, WriteOutcome};
use async_trait::async_trait;
use cdnmanager_types::{Entry, EntryId};

/// Authoritative key-value store holding every entry.
///
/// Implementations must be safe to share across tasks; the sync layer holds
/// one behind an `Arc<dyn RemoteStore>`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches one entry, `None` if the key does not exist.
    async fn get(&self, id: &EntryId) -> CloudResult<Option<Entry>>;

    /// Creates or replaces the entry under `id`.
    ///
    /// A transport failure is an `Err`; a request the store received but
    /// refused is an `Ok` outcome with `success == false`.
    async fn put(&self, id: &EntryId, value: &str, metadata_json: &str)
    -> CloudResult<WriteOutcome>;

    /// Deletes the key. Deleting a missing key succeeds.
    async fn delete(&self, id: &EntryId) -> CloudResult<()>;

    /// Lists one page of entries starting at `cursor` (`None` for the first).
    async fn list(&self, cursor: Option<&str>) -> CloudResult<RemotePage>;
}

//! Sync orchestrator: ordered dual-store mutations.
//!
//! The remote store is authoritative, so every mutation goes remote first
//! and only then touches the local index. The local index must never claim
//! an entry the remote store does not have:
//! - A failed remote call aborts before the local index is touched.
//! - A failed local call after a successful remote call is reported as
//!   [`SyncError::PartialSync`] and left for the caller (or a reconciliation
//!   scan) to deal with. Nothing is retried.

use crate::catalog::fetch_catalog;
use crate::error::{Operation, SyncError, SyncResult};
use crate::lock::IdLocks;
use cdnmanager_cloud::RemoteStore;
use cdnmanager_storage::LocalIndex;
use cdnmanager_types::{Entry, EntryId, Metadata};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of [`SyncOrchestrator::hydrate_local`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HydrationOutcome {
    /// Local and remote counts already agreed.
    UpToDate { entries: usize },
    /// The local index was rebuilt from the remote listing.
    Rebuilt { entries: usize },
}

pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalIndex>,
    locks: IdLocks,
}

impl SyncOrchestrator {
    pub fn new(remote: Arc<dyn RemoteStore>, local: Arc<dyn LocalIndex>) -> Self {
        Self {
            remote,
            local,
            locks: IdLocks::new(),
        }
    }

    /// Validates and writes an entry to both stores.
    pub async fn insert(
        &self,
        id: EntryId,
        value: impl Into<String>,
        metadata: Metadata,
    ) -> SyncResult<Entry> {
        let entry = Entry::new(id, value, metadata)?;
        self.insert_entry(entry).await
    }

    /// Writes an entry to both stores, remote first. Re-inserting an id
    /// replaces the whole entry.
    pub async fn insert_entry(&self, entry: Entry) -> SyncResult<Entry> {
        entry.validate()?;
        let _guard = self.locks.try_acquire(&entry.id)?;
        let id = &entry.id;

        let metadata_json = entry
            .metadata
            .to_json()
            .map_err(|e| SyncError::RemoteWrite {
                id: id.clone(),
                reason: format!("metadata could not be encoded: {e}"),
            })?;

        debug!("remote put {id}");
        let outcome = self
            .remote
            .put(id, &entry.value, &metadata_json)
            .await
            .map_err(|e| {
                warn!("remote put {id} failed: {e}");
                SyncError::RemoteWrite {
                    id: id.clone(),
                    reason: e.to_string(),
                }
            })?;
        if !outcome.success {
            warn!("remote put {id} rejected: {}", outcome.reason());
            return Err(SyncError::RemoteWrite {
                id: id.clone(),
                reason: outcome.reason(),
            });
        }

        debug!("local insert {id}");
        if let Err(e) = self.local.insert(id, &entry.value, &metadata_json).await {
            error!("{id} written remotely but local insert failed: {e}");
            return Err(SyncError::PartialSync {
                id: id.clone(),
                operation: Operation::Insert,
                reason: e.to_string(),
            });
        }

        info!("inserted {id}");
        Ok(entry)
    }

    /// Deletes an entry from both stores, remote first.
    pub async fn delete(&self, id: &EntryId) -> SyncResult<()> {
        let _guard = self.locks.try_acquire(id)?;

        debug!("remote delete {id}");
        self.remote.delete(id).await.map_err(|e| {
            warn!("remote delete {id} failed: {e}");
            SyncError::RemoteDelete {
                id: id.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!("local delete {id}");
        if let Err(e) = self.local.delete(id).await {
            error!("{id} deleted remotely but local delete failed: {e}");
            return Err(SyncError::PartialSync {
                id: id.clone(),
                operation: Operation::Delete,
                reason: e.to_string(),
            });
        }

        info!("deleted {id}");
        Ok(())
    }

    /// Makes the local index mirror the remote catalog.
    ///
    /// Without `force`, a matching id count is taken as up to date. A rebuild
    /// is refused while any remote id is unreadable, since it would drop
    /// that id from the local index. Only the local index is ever written.
    /// Must not run alongside mutations.
    pub async fn hydrate_local(&self, force: bool) -> SyncResult<HydrationOutcome> {
        let catalog = fetch_catalog(self.remote.as_ref()).await?;
        let remote_count = catalog.id_count();

        if !force {
            let local_count = self
                .local
                .count()
                .await
                .map_err(|e| SyncError::Retrieval(format!("local index: {e}")))?;
            if local_count == remote_count {
                debug!("local index up to date ({local_count} entries)");
                return Ok(HydrationOutcome::UpToDate {
                    entries: local_count,
                });
            }
            info!("local index has {local_count} entries, remote has {remote_count}; rebuilding");
        }

        let entries = catalog.into_complete().inspect_err(|e| {
            warn!("not rebuilding local index: {e}");
        })?;
        self.local
            .replace_all(entries)
            .await
            .map_err(|e| SyncError::LocalIndex(e.to_string()))?;
        info!("local index rebuilt with {remote_count} entries");
        Ok(HydrationOutcome::Rebuilt {
            entries: remote_count,
        })
    }
}

//! Consistency scan between the two stores. Reports only; never repairs.

use crate::catalog::fetch_catalog;
use crate::error::{SyncError, SyncResult};
use cdnmanager_cloud::RemoteStore;
use cdnmanager_storage::LocalIndex;
use cdnmanager_types::EntryId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Id-level differences between the local index and the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Local rows whose id no longer exists remotely.
    pub dangling_local: Vec<EntryId>,
    /// Remote entries the local index never received.
    pub missing_local: Vec<EntryId>,
    /// Remote ids whose metadata cannot be decoded. They count as present
    /// remotely but can never be mirrored.
    pub unreadable_remote: Vec<EntryId>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.dangling_local.is_empty()
            && self.missing_local.is_empty()
            && self.unreadable_remote.is_empty()
    }
}

pub struct Reconciler {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalIndex>,
}

impl Reconciler {
    pub fn new(remote: Arc<dyn RemoteStore>, local: Arc<dyn LocalIndex>) -> Self {
        Self { remote, local }
    }

    /// Diffs the full id sets of both stores. All lists come back sorted.
    pub async fn scan(&self) -> SyncResult<ReconciliationReport> {
        let catalog = fetch_catalog(self.remote.as_ref()).await?;
        let readable: BTreeSet<EntryId> = catalog.entries.into_iter().map(|e| e.id).collect();
        let unreadable: BTreeSet<EntryId> = catalog.unreadable.into_iter().collect();
        let local: BTreeSet<EntryId> = self
            .local
            .get_all()
            .await
            .map_err(|e| SyncError::Retrieval(format!("local index: {e}")))?
            .into_iter()
            .map(|e| e.id)
            .collect();

        let remote: BTreeSet<EntryId> = readable.union(&unreadable).cloned().collect();
        let report = ReconciliationReport {
            dangling_local: local.difference(&remote).cloned().collect(),
            missing_local: readable.difference(&local).cloned().collect(),
            unreadable_remote: unreadable.into_iter().collect(),
        };

        if report.is_consistent() {
            info!("stores agree on {} ids", remote.len());
        } else {
            warn!(
                "stores disagree: {} dangling local, {} missing local, {} unreadable remote",
                report.dangling_local.len(),
                report.missing_local.len(),
                report.unreadable_remote.len()
            );
        }
        Ok(report)
    }
}

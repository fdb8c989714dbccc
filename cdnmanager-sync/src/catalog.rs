//! Full remote catalog listing.

use crate::error::{SyncError, SyncResult, UnreadableKeys};
use cdnmanager_cloud::RemoteStore;
use cdnmanager_types::{Entry, EntryId};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Everything the remote listing returned, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCatalog {
    pub entries: Vec<Entry>,
    /// Ids that exist remotely but whose metadata could not be decoded.
    pub unreadable: Vec<EntryId>,
}

impl RemoteCatalog {
    /// Number of ids the remote store holds, readable or not.
    pub fn id_count(&self) -> usize {
        self.entries.len() + self.unreadable.len()
    }

    /// The entries, or an error if any listed id could not be read. A
    /// catalog with holes is never handed out as complete.
    pub fn into_complete(self) -> SyncResult<Vec<Entry>> {
        if self.unreadable.is_empty() {
            Ok(self.entries)
        } else {
            Err(SyncError::UnreadableRemote(UnreadableKeys(self.unreadable)))
        }
    }
}

/// Pages through the whole remote listing and concatenates the pages in order.
///
/// Any page failure aborts the listing; a partial catalog is never returned.
pub async fn fetch_catalog(remote: &dyn RemoteStore) -> SyncResult<RemoteCatalog> {
    let mut catalog = RemoteCatalog::default();
    let mut cursor: Option<String> = None;
    let mut seen = HashSet::new();
    let mut page = 1usize;

    loop {
        let result = remote.list(cursor.as_deref()).await.map_err(|e| {
            warn!("remote listing failed on page {page}: {e}");
            SyncError::Retrieval(format!("remote listing failed on page {page}: {e}"))
        })?;
        debug!(
            "page {page}: {} entries, {} unreadable",
            result.entries.len(),
            result.unreadable.len()
        );
        catalog.entries.extend(result.entries);
        catalog.unreadable.extend(result.unreadable);

        match result.next_cursor {
            None => break,
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(SyncError::Retrieval(format!(
                        "remote listing repeated cursor {next:?} after page {page}"
                    )));
                }
                cursor = Some(next);
                page += 1;
            }
        }
    }

    Ok(catalog)
}

//! Snapshot retrieval for the four query modes.

use crate::catalog::fetch_catalog;
use crate::error::{SyncError, SyncResult};
use crate::snapshot::SearchSnapshot;
use cdnmanager_cloud::RemoteStore;
use cdnmanager_storage::LocalIndex;
use cdnmanager_types::{EntryId, Field, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the full-catalog and multi-value modes read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Page through the remote listing.
    #[default]
    Remote,
    /// Read the local index.
    Local,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub catalog_source: CatalogSource,
}

/// One retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotQuery {
    /// Free text carrying an id somewhere inside it, e.g. a share link.
    ById(String),
    /// First entry whose value matches exactly.
    ByValue(String),
    /// Every entry whose value matches exactly.
    AllByValue(String),
    /// The whole catalog.
    All,
}

impl SnapshotQuery {
    /// Resolves the id a `ById` query carries.
    ///
    /// Text without an id-shaped token is treated as an empty id.
    pub fn extract_id(text: &str) -> SyncResult<EntryId> {
        EntryId::extract(text).ok_or(SyncError::Validation(ValidationError::Missing(Field::Id)))
    }
}

pub struct SnapshotRetriever {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalIndex>,
    config: RetrievalConfig,
}

impl SnapshotRetriever {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            remote,
            local,
            config,
        }
    }

    /// Runs `query` and returns its snapshot. No match is an empty snapshot.
    pub async fn retrieve(&self, query: &SnapshotQuery) -> SyncResult<SearchSnapshot> {
        let snapshot = match query {
            SnapshotQuery::ById(text) => {
                let id = SnapshotQuery::extract_id(text)?;
                debug!("retrieving {id} from local index");
                let entry = self.local.get_by_id(&id).await.map_err(local_failure)?;
                SearchSnapshot::from(entry)
            }
            SnapshotQuery::ByValue(value) => {
                let value = require_value(value)?;
                let entry = self
                    .local
                    .get_by_value(value)
                    .await
                    .map_err(local_failure)?;
                SearchSnapshot::from(entry)
            }
            SnapshotQuery::AllByValue(value) => {
                let value = require_value(value)?;
                match self.config.catalog_source {
                    CatalogSource::Remote => {
                        let mut entries = fetch_catalog(self.remote.as_ref())
                            .await?
                            .into_complete()?;
                        entries.retain(|e| e.value == value);
                        SearchSnapshot::new(entries)
                    }
                    CatalogSource::Local => SearchSnapshot::new(
                        self.local
                            .get_all_by_value(value)
                            .await
                            .map_err(local_failure)?,
                    ),
                }
            }
            SnapshotQuery::All => match self.config.catalog_source {
                CatalogSource::Remote => {
                    SearchSnapshot::new(fetch_catalog(self.remote.as_ref()).await?.into_complete()?)
                }
                CatalogSource::Local => {
                    SearchSnapshot::new(self.local.get_all().await.map_err(local_failure)?)
                }
            },
        };

        info!("retrieved {} entries for {query:?}", snapshot.len());
        Ok(snapshot)
    }
}

/// The value to look up, with surrounding whitespace removed.
fn require_value(value: &str) -> SyncResult<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(Field::Value).into());
    }
    Ok(value)
}

fn local_failure(e: cdnmanager_storage::StorageError) -> SyncError {
    SyncError::Retrieval(format!("local index: {e}"))
}

//! Async seam over the local index.

use crate::entry_store::EntryStore;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use cdnmanager_types::{Entry, EntryId};

/// The local, queryable mirror of the remote store.
///
/// Implementations must be cheap to share behind an `Arc`; the sync layer
/// awaits each call in sequence and never fans out.
#[async_trait]
pub trait LocalIndex: Send + Sync {
    async fn get_by_id(&self, id: &EntryId) -> StorageResult<Option<Entry>>;

    async fn get_by_value(&self, value: &str) -> StorageResult<Option<Entry>>;

    async fn get_all_by_value(&self, value: &str) -> StorageResult<Vec<Entry>>;

    async fn get_all(&self) -> StorageResult<Vec<Entry>>;

    /// Insert or fully replace an entry.
    async fn insert(&self, id: &EntryId, value: &str, metadata_json: &str) -> StorageResult<()>;

    async fn delete(&self, id: &EntryId) -> StorageResult<()>;

    async fn count(&self) -> StorageResult<usize>;

    /// Replace the whole index contents.
    async fn replace_all(&self, entries: Vec<Entry>) -> StorageResult<()>;
}

impl EntryStore {
    /// Runs a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&EntryStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl LocalIndex for EntryStore {
    async fn get_by_id(&self, id: &EntryId) -> StorageResult<Option<Entry>> {
        let id = id.clone();
        self.blocking(move |store| store.get_by_id(&id)).await
    }

    async fn get_by_value(&self, value: &str) -> StorageResult<Option<Entry>> {
        let value = value.to_string();
        self.blocking(move |store| store.get_by_value(&value)).await
    }

    async fn get_all_by_value(&self, value: &str) -> StorageResult<Vec<Entry>> {
        let value = value.to_string();
        self.blocking(move |store| store.get_all_by_value(&value)).await
    }

    async fn get_all(&self) -> StorageResult<Vec<Entry>> {
        self.blocking(|store| store.get_all()).await
    }

    async fn insert(&self, id: &EntryId, value: &str, metadata_json: &str) -> StorageResult<()> {
        let (id, value, metadata_json) = (id.clone(), value.to_string(), metadata_json.to_string());
        self.blocking(move |store| store.insert(&id, &value, &metadata_json))
            .await
    }

    async fn delete(&self, id: &EntryId) -> StorageResult<()> {
        let id = id.clone();
        self.blocking(move |store| store.delete(&id)).await
    }

    async fn count(&self) -> StorageResult<usize> {
        self.blocking(|store| store.count()).await
    }

    async fn replace_all(&self, entries: Vec<Entry>) -> StorageResult<()> {
        self.blocking(move |store| store.replace_all(&entries)).await
    }
}

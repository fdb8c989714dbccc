//! Sync layer for cdnmanager.
//!
//! Ties the authoritative remote store to the local index:
//! - [`SyncOrchestrator`]: ordered dual-store insert/delete and mirror hydration
//! - [`SnapshotRetriever`]: by-id, by-value and full-catalog snapshots
//! - [`SearchIndex`] / [`SearchSession`]: approximate search over the last snapshot
//! - [`BulkImporter`]: template-driven sequential inserts
//! - [`Reconciler`]: id-set diff between the stores

pub mod catalog;
pub mod error;
pub mod import;
pub mod lock;
pub mod orchestrator;
pub mod reconcile;
pub mod retriever;
pub mod search;
pub mod snapshot;

pub use catalog::{fetch_catalog, RemoteCatalog};
pub use error::{Operation, SyncError, SyncResult, UnreadableKeys};
pub use import::{
    template_header, write_template, BulkImporter, ImportPolicy, ImportReport, RowOutcome,
    TEMPLATE_FILE_NAME,
};
pub use lock::{IdGuard, IdLocks};
pub use orchestrator::{HydrationOutcome, SyncOrchestrator};
pub use reconcile::{Reconciler, ReconciliationReport};
pub use retriever::{CatalogSource, RetrievalConfig, SnapshotQuery, SnapshotRetriever};
pub use search::{SearchConfig, SearchField, SearchHit, SearchIndex, SearchSession};
pub use snapshot::SearchSnapshot;

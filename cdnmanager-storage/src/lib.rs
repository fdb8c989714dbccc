//! DuckDB local index for cdnmanager.
//!
//! The local index is a derived, queryable mirror of the remote key-value
//! store. It answers exact lookups (by id, by value) and full listings
//! without a network round-trip, but it is never authoritative: anything it
//! holds must also exist remotely.
//!
//! # Architecture
//!
//! - [`EntryStore`] is the blocking DuckDB implementation
//! - [`LocalIndex`] is the async seam the sync layer talks to; `EntryStore`
//!   implements it by moving each call onto the blocking thread pool

mod entry_store;
mod error;
mod local_index;

pub use entry_store::EntryStore;
pub use error::{StorageError, StorageResult};
pub use local_index::LocalIndex;

use std::path::{Path, PathBuf};
use tracing::warn;

/// Opens the index database, retrying once without its WAL file.
///
/// An index left behind by a killed process can carry a write-ahead log
/// DuckDB refuses to replay. The index is rebuildable from the remote store,
/// so losing the unflushed tail of that log is acceptable.
pub(crate) fn open_index_connection(
    path: &Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<duckdb::Connection> {
    let conn = match duckdb::Connection::open(path) {
        Ok(conn) => conn,
        Err(first_err) => {
            let wal = wal_path(path);
            if !wal.exists() {
                return Err(first_err.into());
            }
            warn!(
                "local index at {} failed to open ({first_err}); discarding {} and retrying",
                path.display(),
                wal.display()
            );
            std::fs::remove_file(&wal).map_err(|_| StorageError::DuckDb(first_err))?;
            duckdb::Connection::open(path)?
        }
    };
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit}'; PRAGMA threads={threads};"
    ))?;
    Ok(conn)
}

/// DuckDB keeps its log next to the database as `<file>.wal`.
fn wal_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".wal");
    PathBuf::from(name)
}

//! Entry store: the local index table.
//!
//! One row per entry: the id, the value, and the metadata record as JSON.
//! Listings come back in insertion order; re-inserting an id replaces its
//! value and metadata but keeps its original position.

use crate::error::{StorageError, StorageResult};
use cdnmanager_types::{Entry, EntryId, Metadata};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

const UPSERT_SQL: &str = r#"
    INSERT INTO records (id, value, metadata_json) VALUES (?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        value = excluded.value,
        metadata_json = excluded.metadata_json
"#;

const SELECT_COLUMNS: &str = "SELECT id, value, metadata_json FROM records";

/// The index is one narrow table read by a single CLI process; DuckDB's
/// defaults (most of RAM, every core) are far more than it needs.
const INDEX_MEMORY_LIMIT: &str = "128MB";
const INDEX_THREADS: u32 = 1;

/// Local index backed by DuckDB.
#[derive(Clone)]
pub struct EntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl EntryStore {
    /// Opens or creates an entry store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_index_connection(path, INDEX_MEMORY_LIMIT, INDEX_THREADS)?;
        initialize_records_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory entry store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_records_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Acquire the connection lock, recovering from poison if a prior
    /// panic happened while the lock was held.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("entry store recovering from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Get a single entry by id.
    pub fn get_by_id(&self, id: &EntryId) -> StorageResult<Option<Entry>> {
        let conn = self.lock_conn();
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        Ok(load_entries(&conn, &sql, params![id.as_str()])?.into_iter().next())
    }

    /// Get the earliest-inserted entry whose value matches exactly.
    pub fn get_by_value(&self, value: &str) -> StorageResult<Option<Entry>> {
        let conn = self.lock_conn();
        let sql = format!("{SELECT_COLUMNS} WHERE value = ? ORDER BY position LIMIT 1");
        Ok(load_entries(&conn, &sql, params![value])?.into_iter().next())
    }

    /// Get every entry whose value matches exactly, in insertion order.
    pub fn get_all_by_value(&self, value: &str) -> StorageResult<Vec<Entry>> {
        let conn = self.lock_conn();
        let sql = format!("{SELECT_COLUMNS} WHERE value = ? ORDER BY position");
        load_entries(&conn, &sql, params![value])
    }

    /// Get every entry, in insertion order.
    pub fn get_all(&self) -> StorageResult<Vec<Entry>> {
        let conn = self.lock_conn();
        let sql = format!("{SELECT_COLUMNS} ORDER BY position");
        load_entries(&conn, &sql, params![])
    }

    /// Insert or fully replace an entry. The metadata must be a valid
    /// metadata record; it is re-serialized before storage.
    pub fn insert(&self, id: &EntryId, value: &str, metadata_json: &str) -> StorageResult<()> {
        let metadata = Metadata::from_json(metadata_json)?;
        let conn = self.lock_conn();
        conn.execute(UPSERT_SQL, params![id.as_str(), value, metadata.to_json()?])?;
        debug!("local index upserted {id}");
        Ok(())
    }

    /// Delete an entry. Deleting an absent id is not an error.
    pub fn delete(&self, id: &EntryId) -> StorageResult<()> {
        let conn = self.lock_conn();
        let removed = conn.execute("DELETE FROM records WHERE id = ?", params![id.as_str()])?;
        debug!("local index deleted {id} ({removed} rows)");
        Ok(())
    }

    /// Number of entries in the index.
    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Replace the whole index with `entries`, keeping their order.
    ///
    /// Runs in one transaction: either the new contents are fully visible or
    /// the old contents are kept.
    pub fn replace_all(&self, entries: &[Entry]) -> StorageResult<()> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;
        tx.execute_batch("DROP TABLE IF EXISTS records;")?;
        create_records_table(&tx)?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for entry in entries {
                stmt.execute(params![
                    entry.id.as_str(),
                    entry.value,
                    entry.metadata.to_json()?
                ])?;
            }
        }
        tx.commit()?;
        debug!("local index rebuilt with {} entries", entries.len());
        Ok(())
    }
}

fn load_entries<P: duckdb::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StorageResult<Vec<Entry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<_, _>>()?;

    rows.into_iter()
        .map(|(id, value, metadata_json)| decode_row(id, value, &metadata_json))
        .collect()
}

fn decode_row(id: String, value: String, metadata_json: &str) -> StorageResult<Entry> {
    let entry_id = EntryId::parse(&id).map_err(|e| StorageError::CorruptRow {
        id: id.clone(),
        reason: e.to_string(),
    })?;
    let metadata = Metadata::from_json(metadata_json).map_err(|e| StorageError::CorruptRow {
        id,
        reason: format!("metadata: {e}"),
    })?;
    Ok(Entry {
        id: entry_id,
        value,
        metadata,
    })
}

fn create_records_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id VARCHAR PRIMARY KEY,
            value TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            position BIGINT NOT NULL DEFAULT nextval('records_position_seq')
        );
        "#,
    )?;
    Ok(())
}

fn initialize_records_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch("CREATE SEQUENCE IF NOT EXISTS records_position_seq;")?;
    create_records_table(conn)
}

//! In-memory stores with failure injection for sync tests.
#![allow(dead_code)]

use async_trait::async_trait;
use cdnmanager_cloud::{CloudError, CloudResult, RemotePage, RemoteStore, WriteOutcome};
use cdnmanager_storage::{LocalIndex, StorageError, StorageResult};
use cdnmanager_types::{Entry, EntryId, Metadata};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Ordered record of store calls shared by both mocks.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn id(n: u32) -> EntryId {
    EntryId::parse(&format!("a1b2c3d4-0000-0000-0000-{n:012}")).unwrap()
}

pub fn metadata(name: &str) -> Metadata {
    Metadata {
        name: name.into(),
        external: true,
        mimetype: "text/html".into(),
        location: "example.com".into(),
        description: None,
        cloud_storage_id: None,
        md5_checksum: None,
    }
}

pub fn entry(n: u32, value: &str, name: &str) -> Entry {
    Entry {
        id: id(n),
        value: value.into(),
        metadata: metadata(name),
    }
}

// ── Remote ───────────────────────────────────────────────────────

/// Holds a remote put open until the test releases it.
#[derive(Default)]
pub struct PutGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Remote store backed by a sorted map, listed in key order like the real one.
pub struct MockRemote {
    entries: Mutex<BTreeMap<EntryId, Entry>>,
    /// Ids listed on the first page with undecodable metadata.
    unreadable: Mutex<Vec<EntryId>>,
    log: CallLog,
    page_size: usize,
    gate: Option<Arc<PutGate>>,
    pub fail_put: AtomicBool,
    pub reject_put: AtomicBool,
    pub fail_delete: AtomicBool,
    /// 1-based listing page that fails.
    pub fail_page: Mutex<Option<usize>>,
}

impl MockRemote {
    pub fn new(log: CallLog) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            unreadable: Mutex::new(Vec::new()),
            log,
            page_size: 1000,
            gate: None,
            fail_put: AtomicBool::new(false),
            reject_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_page: Mutex::new(None),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_gate(mut self, gate: Arc<PutGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Seeds an entry without going through `put`.
    pub fn seed(&self, entry: Entry) {
        self.entries.lock().unwrap().insert(entry.id.clone(), entry);
    }

    /// Seeds an id whose stored metadata no longer decodes.
    pub fn seed_unreadable(&self, id: EntryId) {
        self.unreadable.lock().unwrap().push(id);
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn fail_on_page(&self, page: usize) {
        *self.fail_page.lock().unwrap() = Some(page);
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn get(&self, id: &EntryId) -> CloudResult<Option<Entry>> {
        self.record(format!("remote.get {id}"));
        Ok(self.entries.lock().unwrap().get(id).cloned())
    }

    async fn put(
        &self,
        id: &EntryId,
        value: &str,
        metadata_json: &str,
    ) -> CloudResult<WriteOutcome> {
        self.record(format!("remote.put {id}"));
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(CloudError::Api("connection reset".into()));
        }
        if self.reject_put.load(Ordering::SeqCst) {
            return Ok(WriteOutcome::rejected(vec!["10014: metadata too large".into()]));
        }
        let metadata = Metadata::from_json(metadata_json)?;
        let entry = Entry {
            id: id.clone(),
            value: value.to_string(),
            metadata,
        };
        self.entries.lock().unwrap().insert(id.clone(), entry);
        Ok(WriteOutcome::ok())
    }

    async fn delete(&self, id: &EntryId) -> CloudResult<()> {
        self.record(format!("remote.delete {id}"));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CloudError::Api("connection reset".into()));
        }
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list(&self, cursor: Option<&str>) -> CloudResult<RemotePage> {
        let offset = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| CloudError::Api(format!("bad cursor {c}")))?,
            None => 0,
        };
        let page = offset / self.page_size + 1;
        self.record(format!("remote.list page {page}"));
        if *self.fail_page.lock().unwrap() == Some(page) {
            return Err(CloudError::Api(format!("page {page} unavailable")));
        }

        let entries = self.entries.lock().unwrap();
        let next = offset + self.page_size;
        let unreadable = if page == 1 {
            self.unreadable.lock().unwrap().clone()
        } else {
            Vec::new()
        };
        Ok(RemotePage {
            unreadable,
            entries: entries
                .values()
                .skip(offset)
                .take(self.page_size)
                .cloned()
                .collect(),
            next_cursor: (next < entries.len()).then(|| next.to_string()),
        })
    }
}

// ── Local ────────────────────────────────────────────────────────

/// Local index kept as an insertion-ordered list.
pub struct MockLocal {
    entries: Mutex<Vec<Entry>>,
    log: CallLog,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MockLocal {
    pub fn new(log: CallLog) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log,
            fail_insert: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, entry: Entry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn check_reads(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Task("disk unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalIndex for MockLocal {
    async fn get_by_id(&self, id: &EntryId) -> StorageResult<Option<Entry>> {
        self.check_reads()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.id == id)
            .cloned())
    }

    async fn get_by_value(&self, value: &str) -> StorageResult<Option<Entry>> {
        self.check_reads()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.value == value)
            .cloned())
    }

    async fn get_all_by_value(&self, value: &str) -> StorageResult<Vec<Entry>> {
        self.check_reads()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.value == value)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> StorageResult<Vec<Entry>> {
        self.check_reads()?;
        Ok(self.snapshot())
    }

    async fn insert(&self, id: &EntryId, value: &str, metadata_json: &str) -> StorageResult<()> {
        self.record(format!("local.insert {id}"));
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StorageError::Task("disk full".into()));
        }
        let entry = Entry {
            id: id.clone(),
            value: value.to_string(),
            metadata: Metadata::from_json(metadata_json)?,
        };
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| &e.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> StorageResult<()> {
        self.record(format!("local.delete {id}"));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Task("disk full".into()));
        }
        self.entries.lock().unwrap().retain(|e| &e.id != id);
        Ok(())
    }

    async fn count(&self) -> StorageResult<usize> {
        self.check_reads()?;
        Ok(self.entries.lock().unwrap().len())
    }

    async fn replace_all(&self, entries: Vec<Entry>) -> StorageResult<()> {
        self.record(format!("local.replace_all {}", entries.len()));
        *self.entries.lock().unwrap() = entries;
        Ok(())
    }
}

/// Routes sync-layer logs to the test harness; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Both mocks over one shared call log.
pub fn stores() -> (Arc<MockRemote>, Arc<MockLocal>, CallLog) {
    init_tracing();
    let log = CallLog::default();
    (
        Arc::new(MockRemote::new(log.clone())),
        Arc::new(MockLocal::new(log.clone())),
        log,
    )
}

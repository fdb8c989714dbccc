use cdnmanager_types::Entry;
use serde::Serialize;

/// Ordered result of one retrieval.
///
/// Immutable once produced. A new retrieval produces a new snapshot; nothing
/// patches an existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchSnapshot {
    entries: Vec<Entry>,
}

impl SearchSnapshot {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl From<Vec<Entry>> for SearchSnapshot {
    fn from(entries: Vec<Entry>) -> Self {
        Self::new(entries)
    }
}

impl From<Option<Entry>> for SearchSnapshot {
    fn from(entry: Option<Entry>) -> Self {
        Self::new(entry.into_iter().collect())
    }
}

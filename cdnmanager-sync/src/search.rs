//! Approximate text search over the current snapshot.
//!
//! Scoring is approximate substring matching: the query may start anywhere
//! in a field, and the score is the fewest character edits needed to match
//! it there, divided by the query length. `0.0` is an exact substring match;
//! anything above the threshold is dropped.

use crate::error::{SyncError, SyncResult};
use crate::retriever::{SnapshotQuery, SnapshotRetriever};
use crate::snapshot::SearchSnapshot;
use cdnmanager_types::{Entry, Metadata};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Metadata fields searched by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    Mimetype,
    Location,
    Description,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Name,
        SearchField::Mimetype,
        SearchField::Location,
        SearchField::Description,
    ];

    fn text(self, metadata: &Metadata) -> Option<&str> {
        match self {
            SearchField::Name => Some(&metadata.name),
            SearchField::Mimetype => Some(&metadata.mimetype),
            SearchField::Location => Some(&metadata.location),
            SearchField::Description => metadata.description.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Highest score that still counts as a match, on a 0 (exact) to 1 scale.
    pub threshold: f64,
    pub fields: Vec<SearchField>,
}

impl SearchConfig {
    /// Default fields with the given threshold, which must lie in `0.0..=1.0`.
    pub fn with_threshold(threshold: f64) -> SyncResult<Self> {
        let config = Self {
            threshold,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SyncError::Config(format!(
                "search threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.fields.is_empty() {
            return Err(SyncError::Config("no search fields configured".into()));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            fields: SearchField::ALL.to_vec(),
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit<'a> {
    pub entry: &'a Entry,
    pub score: f64,
}

/// Matcher built over one snapshot.
///
/// Owns its snapshot; a new snapshot means a new index.
pub struct SearchIndex {
    snapshot: SearchSnapshot,
    config: SearchConfig,
    /// Lowercased characters of each configured field, per entry.
    keys: Vec<Vec<Vec<char>>>,
}

impl SearchIndex {
    pub fn build(snapshot: SearchSnapshot, config: SearchConfig) -> Self {
        let keys = snapshot
            .iter()
            .map(|entry| {
                config
                    .fields
                    .iter()
                    .filter_map(|field| field.text(&entry.metadata))
                    .filter(|text| !text.is_empty())
                    .map(lowercase_chars)
                    .collect()
            })
            .collect();
        Self {
            snapshot,
            config,
            keys,
        }
    }

    pub fn snapshot(&self) -> &SearchSnapshot {
        &self.snapshot
    }

    /// Ranks matching entries by ascending score, ties in snapshot order.
    ///
    /// A blank query returns the whole snapshot unranked.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return self
                .snapshot
                .iter()
                .map(|entry| SearchHit { entry, score: 0.0 })
                .collect();
        }

        let pattern = lowercase_chars(query);
        let mut hits: Vec<SearchHit<'_>> = self
            .snapshot
            .iter()
            .zip(&self.keys)
            .filter_map(|(entry, fields)| {
                let score = fields
                    .iter()
                    .map(|text| substring_score(&pattern, text))
                    .fold(1.0_f64, f64::min);
                (score <= self.config.threshold).then_some(SearchHit { entry, score })
            })
            .collect();
        // Stable: equal scores keep snapshot order.
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        debug!("query {query:?}: {} of {} entries", hits.len(), self.snapshot.len());
        hits
    }
}

/// Search state of one session: the last successful snapshot and its index.
pub struct SearchSession {
    retriever: SnapshotRetriever,
    config: SearchConfig,
    index: Option<SearchIndex>,
}

impl SearchSession {
    pub fn new(retriever: SnapshotRetriever, config: SearchConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            retriever,
            config,
            index: None,
        })
    }

    /// Retrieves a new snapshot and rebuilds the index over it.
    ///
    /// On failure the previous snapshot stays current.
    pub async fn retrieve(&mut self, query: &SnapshotQuery) -> SyncResult<&SearchSnapshot> {
        let snapshot = self.retriever.retrieve(query).await?;
        let index = self
            .index
            .insert(SearchIndex::build(snapshot, self.config.clone()));
        Ok(index.snapshot())
    }

    /// Searches the current snapshot. Empty before the first retrieval.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        self.index
            .as_ref()
            .map(|index| index.search(query))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<&SearchSnapshot> {
        self.index.as_ref().map(SearchIndex::snapshot)
    }

    /// Replaces the matcher settings, rebuilding the current index.
    pub fn set_config(&mut self, config: SearchConfig) -> SyncResult<()> {
        config.validate()?;
        self.config = config;
        if let Some(index) = self.index.take() {
            self.index = Some(SearchIndex::build(index.snapshot, self.config.clone()));
        }
        Ok(())
    }
}

fn lowercase_chars(text: &str) -> Vec<char> {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Fewest edits to match `pattern` somewhere in `text`, over the pattern length.
fn substring_score(pattern: &[char], text: &[char]) -> f64 {
    if pattern.is_empty() {
        return 0.0;
    }
    // Row 0 is all zeros: a match may begin at any text position.
    let mut prev = vec![0usize; text.len() + 1];
    let mut curr = vec![0usize; text.len() + 1];
    for (i, &p) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &t) in text.iter().enumerate() {
            let substitute = prev[j] + usize::from(p != t);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let edits = prev.iter().copied().min().unwrap_or(pattern.len());
    (edits as f64 / pattern.len() as f64).min(1.0)
}

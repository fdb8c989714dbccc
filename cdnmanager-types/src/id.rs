//! Entry identifiers.

use crate::error::{Field, ValidationError, ValidationResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Canonical 8-4-4-4-12 hex token, matched anywhere inside free text.
static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}(?:-[0-9a-fA-F]{4}){3}-[0-9a-fA-F]{12}\b")
        .expect("entry id pattern is valid")
});

/// Primary key of an entry in both stores.
///
/// Always in canonical hyphenated form. The original casing is kept, since
/// the remote store compares keys byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Parses a bare identifier. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::Missing(Field::Id));
        }
        if !is_canonical(raw) {
            return Err(ValidationError::malformed(
                Field::Id,
                format!("`{raw}` is not an 8-4-4-4-12 hex identifier"),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Extracts the first identifier-shaped token from arbitrary text,
    /// e.g. a pasted share link.
    pub fn extract(text: &str) -> Option<Self> {
        ID_PATTERN
            .find(text)
            .map(|m| Self(m.as_str().to_string()))
    }

    /// Generates a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_canonical(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntryId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Entries and their metadata records.

use crate::error::{Field, ValidationError, ValidationResult};
use crate::id::EntryId;
use serde::{Deserialize, Serialize};

/// Metadata attached to an entry.
///
/// This is also the JSON shape stored as key metadata in the remote store
/// and as `metadata_json` in the local index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Display title.
    pub name: String,
    /// True when the resource is hosted outside this system.
    pub external: bool,
    pub mimetype: String,
    /// Domain or owner reference.
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_storage_id: Option<String>,
    #[serde(rename = "md5Checksum", default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
}

impl Metadata {
    /// Checks the required fields.
    pub fn validate(&self) -> ValidationResult<()> {
        require(Field::Name, &self.name)?;
        require(Field::Mimetype, &self.mimetype)?;
        require(Field::Location, &self.location)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn require(field: Field, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

/// Parses the `external` flag from its textual form.
///
/// Only the words `true` and `false` (any ASCII case) are accepted. Empty
/// input and the form placeholder `default` mean the caller never chose,
/// which is reported as missing rather than read as `false`.
pub fn parse_external(raw: &str) -> ValidationResult<bool> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("default") {
        return Err(ValidationError::Missing(Field::External));
    }
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValidationError::malformed(
            Field::External,
            format!("expected `true` or `false`, got `{raw}`"),
        ))
    }
}

/// Untyped metadata as collected from a form or a template row.
///
/// Every field is raw text. [`MetadataDraft::build`] turns it into a
/// [`Metadata`] or reports the first field that is missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDraft {
    pub name: Option<String>,
    pub external: Option<String>,
    pub mimetype: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub cloud_storage_id: Option<String>,
    pub md5_checksum: Option<String>,
}

impl MetadataDraft {
    /// Sets the raw text for a metadata field. Non-metadata fields are ignored.
    pub fn set(&mut self, field: Field, raw: impl Into<String>) {
        let raw = Some(raw.into());
        match field {
            Field::Name => self.name = raw,
            Field::External => self.external = raw,
            Field::Mimetype => self.mimetype = raw,
            Field::Location => self.location = raw,
            Field::Description => self.description = raw,
            Field::CloudStorageId => self.cloud_storage_id = raw,
            Field::Md5Checksum => self.md5_checksum = raw,
            Field::Id | Field::Value => {}
        }
    }

    /// Builds the typed record, checking fields in template column order.
    ///
    /// Storage-side identifiers (`cloud_storage_id`, `md5Checksum`) only
    /// describe resources hosted here, so they are dropped for external ones.
    pub fn build(self) -> ValidationResult<Metadata> {
        let name = required(Field::Name, self.name)?;
        let external = parse_external(self.external.as_deref().unwrap_or_default())?;
        let mimetype = required(Field::Mimetype, self.mimetype)?;
        let location = required(Field::Location, self.location)?;

        let (cloud_storage_id, md5_checksum) = if external {
            (None, None)
        } else {
            (optional(self.cloud_storage_id), optional(self.md5_checksum))
        };

        Ok(Metadata {
            name,
            external,
            mimetype,
            location,
            description: optional(self.description),
            cloud_storage_id,
            md5_checksum,
        })
    }
}

fn required(field: Field, raw: Option<String>) -> ValidationResult<String> {
    optional(raw).ok_or(ValidationError::Missing(field))
}

fn optional(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// A catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub value: String,
    pub metadata: Metadata,
}

impl Entry {
    /// Builds a validated entry.
    pub fn new(id: EntryId, value: impl Into<String>, metadata: Metadata) -> ValidationResult<Self> {
        let entry = Self {
            id,
            value: value.into(),
            metadata,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks every precondition for writing this entry to a store.
    pub fn validate(&self) -> ValidationResult<()> {
        require(Field::Value, &self.value)?;
        self.metadata.validate()
    }
}

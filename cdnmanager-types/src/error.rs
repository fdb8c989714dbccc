//! Validation error types.

use std::fmt;
use thiserror::Error;

/// Result type for entry construction.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A field of an [`Entry`](crate::Entry), named after its bulk template column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Value,
    Name,
    External,
    Mimetype,
    Location,
    Description,
    CloudStorageId,
    Md5Checksum,
}

impl Field {
    /// All fields in bulk template column order.
    pub const ALL: [Field; 9] = [
        Field::Id,
        Field::Value,
        Field::Name,
        Field::External,
        Field::Mimetype,
        Field::Location,
        Field::Description,
        Field::CloudStorageId,
        Field::Md5Checksum,
    ];

    /// The bulk template column that carries this field.
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "name",
            Field::Value => "value",
            Field::Name => "metadata_name",
            Field::External => "metadata_external",
            Field::Mimetype => "metadata_mimetype",
            Field::Location => "metadata_location",
            Field::Description => "metadata_description",
            Field::CloudStorageId => "metadata_cloud_storage_id",
            Field::Md5Checksum => "metadata_md5Checksum",
        }
    }

    /// Looks up a field by its template column name.
    pub fn from_column(column: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == column)
    }

    /// Whether an entry can be built without this field.
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Field::Description | Field::CloudStorageId | Field::Md5Checksum
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A required field is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    Missing(Field),

    #[error("malformed field `{field}`: {reason}")]
    Malformed { field: Field, reason: String },
}

impl ValidationError {
    pub fn malformed(field: Field, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// The field that failed validation.
    pub fn field(&self) -> Field {
        match self {
            Self::Missing(field) => *field,
            Self::Malformed { field, .. } => *field,
        }
    }
}

//! Core types for cdnmanager.
//!
//! An [`Entry`] is one addressable resource record: an [`EntryId`] key, a
//! target value (usually a URL) and a typed [`Metadata`] record. The same
//! shape is stored in the remote key-value store and in the local index.
//!
//! Validation happens at construction time. Anything that fails here is a
//! [`ValidationError`] naming the offending [`Field`], raised before any
//! store is touched.

mod entry;
mod error;
mod id;

pub use entry::{parse_external, Entry, Metadata, MetadataDraft};
pub use error::{Field, ValidationError, ValidationResult};
pub use id::EntryId;

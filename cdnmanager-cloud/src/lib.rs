//! Remote key-value store for cdnmanager.
//!
//! The remote store is authoritative: an entry exists if and only if its key
//! exists here. Provides:
//! - The [`RemoteStore`] seam used by the sync layer
//! - [`KvApiClient`], a Workers KV REST implementation of it
//! - Cursor-paged key listing

pub mod api_client;
pub mod config;
pub mod error;
pub mod remote_store;
pub mod types;

pub use api_client::KvApiClient;
pub use config::KvConfig;
pub use error::{CloudError, CloudResult};
pub use remote_store::RemoteStore;
pub use types::*;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cdnmanager")]
#[command(about = "Manage a CDN resource catalog mirrored from Workers KV", version)]
pub struct Cli {
    /// Local index database.
    #[arg(long, env = "CDNMANAGER_DB", default_value = "cdnmanager.duckdb")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebuild the local index from the remote catalog if they differ.
    Hydrate {
        #[arg(long)]
        force: bool,
    },
    Insert(InsertArgs),
    Delete {
        id: String,
    },
    /// Look up one entry by any text containing its id, e.g. a share link.
    Get {
        text: String,
    },
    FindValue {
        value: String,
        #[arg(long)]
        all: bool,
    },
    List,
    /// Retrieve the full catalog and search it approximately.
    Search {
        query: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    Import {
        file: PathBuf,
        /// Keep going past rows that fail in a store.
        #[arg(long)]
        keep_going: bool,
    },
    /// Write a blank bulk insert template.
    Template {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    Reconcile,
}

#[derive(Debug, Args)]
pub struct InsertArgs {
    #[arg(long, required_unless_present = "generate", conflicts_with = "generate")]
    pub id: Option<String>,
    /// Use a freshly generated id.
    #[arg(long)]
    pub generate: bool,
    #[arg(long)]
    pub value: String,
    #[arg(long)]
    pub name: String,
    /// `true` or `false`; there is no default.
    #[arg(long)]
    pub external: String,
    #[arg(long)]
    pub mimetype: String,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub cloud_storage_id: Option<String>,
    #[arg(long = "md5")]
    pub md5_checksum: Option<String>,
}

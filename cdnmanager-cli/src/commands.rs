use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cdnmanager_cloud::{KvApiClient, KvConfig, RemoteStore};
use cdnmanager_storage::{EntryStore, LocalIndex};
use cdnmanager_sync::{
    write_template, BulkImporter, ImportPolicy, ImportReport, Reconciler, RetrievalConfig,
    SearchConfig, SearchIndex, SnapshotQuery, SnapshotRetriever, SyncOrchestrator,
};
use cdnmanager_types::{EntryId, Field, MetadataDraft};
use serde_json::json;
use tracing::info;

use crate::cli::{Commands, InsertArgs};

pub(crate) async fn run(db: &Path, command: Commands) -> Result<()> {
    if let Commands::Template { dir } = &command {
        let path = write_template(dir).await?;
        return print_json(&json!({ "path": path }));
    }

    let config = KvConfig::from_env().context("remote store is not configured")?;
    let store = EntryStore::open(db)
        .with_context(|| format!("failed to open local index at {}", db.display()))?;
    let remote: Arc<dyn RemoteStore> = Arc::new(KvApiClient::new(config.clone()));
    let local: Arc<dyn LocalIndex> = Arc::new(store);
    let retriever = || {
        SnapshotRetriever::new(remote.clone(), local.clone(), RetrievalConfig::default())
    };

    match command {
        Commands::Template { .. } => {}
        Commands::Hydrate { force } => {
            let sync = SyncOrchestrator::new(remote.clone(), local.clone());
            print_json(&sync.hydrate_local(force).await?)?;
        }
        Commands::Insert(args) => {
            let sync = SyncOrchestrator::new(remote.clone(), local.clone());
            let (id, value, draft) = insert_request(args)?;
            let metadata = draft.build()?;
            let entry = sync.insert(id, value, metadata).await?;
            let share_url = config.share_url(entry.id.as_str());
            print_json(&json!({ "entry": entry, "share_url": share_url }))?;
        }
        Commands::Delete { id } => {
            let sync = SyncOrchestrator::new(remote.clone(), local.clone());
            let id = EntryId::parse(&id)?;
            sync.delete(&id).await?;
            print_json(&json!({ "deleted": id }))?;
        }
        Commands::Get { text } => {
            let snapshot = retriever().retrieve(&SnapshotQuery::ById(text)).await?;
            print_json(&snapshot)?;
        }
        Commands::FindValue { value, all } => {
            let query = if all {
                SnapshotQuery::AllByValue(value)
            } else {
                SnapshotQuery::ByValue(value)
            };
            print_json(&retriever().retrieve(&query).await?)?;
        }
        Commands::List => {
            print_json(&retriever().retrieve(&SnapshotQuery::All).await?)?;
        }
        Commands::Search { query, threshold } => {
            let search = match threshold {
                Some(threshold) => SearchConfig::with_threshold(threshold)?,
                None => SearchConfig::default(),
            };
            let snapshot = retriever().retrieve(&SnapshotQuery::All).await?;
            let index = SearchIndex::build(snapshot, search);
            print_json(&index.search(&query))?;
        }
        Commands::Import { file, keep_going } => {
            let sync = Arc::new(SyncOrchestrator::new(remote.clone(), local.clone()));
            let policy = ImportPolicy {
                stop_on_store_error: !keep_going,
            };
            let report = BulkImporter::new(sync, policy).import_file(&file).await?;
            info!("{} rows committed", report.committed());
            print_json(&report_json(&report))?;
            ensure_complete(&report)?;
        }
        Commands::Reconcile => {
            let report = Reconciler::new(remote.clone(), local.clone()).scan().await?;
            print_json(&report)?;
        }
    }
    Ok(())
}

fn insert_request(args: InsertArgs) -> Result<(EntryId, String, MetadataDraft)> {
    let id = match args.id {
        Some(raw) => EntryId::parse(&raw)?,
        None => EntryId::generate(),
    };
    let mut draft = MetadataDraft::default();
    draft.set(Field::Name, args.name);
    draft.set(Field::External, args.external);
    draft.set(Field::Mimetype, args.mimetype);
    draft.set(Field::Location, args.location);
    for (field, raw) in [
        (Field::Description, args.description),
        (Field::CloudStorageId, args.cloud_storage_id),
        (Field::Md5Checksum, args.md5_checksum),
    ] {
        if let Some(raw) = raw {
            draft.set(field, raw);
        }
    }
    Ok((id, args.value, draft))
}

fn report_json(report: &ImportReport) -> serde_json::Value {
    let rows: Vec<_> = report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(entry) => json!({
                "row": outcome.row,
                "line": outcome.line,
                "id": entry.id,
                "status": "success",
            }),
            Err(e) => json!({
                "row": outcome.row,
                "line": outcome.line,
                "id": outcome.id,
                "status": "failed",
                "field": e.validation().map(|v| v.field().column()),
                "partial": e.is_partial(),
                "error": e.to_string(),
            }),
        })
        .collect();
    json!({
        "total_rows": report.total_rows,
        "committed": report.committed(),
        "halted_at": report.halted_at,
        "rows": rows,
    })
}

/// Fails when any row was skipped or failed, so scripts see a non-zero exit.
fn ensure_complete(report: &ImportReport) -> Result<()> {
    if report.is_complete() {
        return Ok(());
    }
    let partial = report
        .failures()
        .filter(|o| matches!(&o.result, Err(e) if e.is_partial()))
        .count();
    let mut message = format!(
        "import incomplete: {} of {} rows committed",
        report.committed(),
        report.total_rows
    );
    if let Some(row) = report.halted_at {
        message.push_str(&format!(", halted at row {row}"));
    }
    if partial > 0 {
        message.push_str(&format!(
            "; {partial} rows reached the remote store only, run `reconcile`"
        ));
    }
    anyhow::bail!(message)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

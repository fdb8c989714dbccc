//! Bulk import from the delimited-text template.
//!
//! Rows are committed one at a time, in file order, through the
//! orchestrator. The first invalid row halts the import; rows committed
//! before it stay committed.

use crate::error::{SyncError, SyncResult};
use crate::orchestrator::SyncOrchestrator;
use cdnmanager_types::{Entry, EntryId, Field, MetadataDraft, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File name used when generating a blank template.
pub const TEMPLATE_FILE_NAME: &str = "CDN Manager Bulk Insert Template.csv";

/// Header row of a blank template.
pub fn template_header() -> String {
    Field::ALL
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(",")
}

/// Writes a header-only template into `dir` and returns its path.
pub async fn write_template(dir: impl AsRef<Path>) -> SyncResult<PathBuf> {
    let path = dir.as_ref().join(TEMPLATE_FILE_NAME);
    tokio::fs::write(&path, format!("{}\n", template_header())).await?;
    info!("wrote template to {}", path.display());
    Ok(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPolicy {
    /// Halt on a store failure as well as on invalid rows.
    pub stop_on_store_error: bool,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            stop_on_store_error: true,
        }
    }
}

/// Outcome of one data row.
#[derive(Debug)]
pub struct RowOutcome {
    /// 1-based data row, not counting the header.
    pub row: usize,
    /// 1-based source line the row starts on.
    pub line: usize,
    pub id: Option<EntryId>,
    pub result: Result<Entry, SyncError>,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    /// Data rows in the file.
    pub total_rows: usize,
    /// One outcome per attempted row, in file order.
    pub outcomes: Vec<RowOutcome>,
    /// Row the import stopped at, if it stopped early or on its last row.
    pub halted_at: Option<usize>,
}

impl ImportReport {
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Every row was attempted and committed.
    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == self.total_rows && self.failures().next().is_none()
    }
}

pub struct BulkImporter {
    orchestrator: Arc<SyncOrchestrator>,
    policy: ImportPolicy,
}

impl BulkImporter {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, policy: ImportPolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    /// Reads a template file and imports it.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> SyncResult<ImportReport> {
        let path = path.as_ref();
        debug!("reading {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        self.import_str(&text).await
    }

    /// Imports template text. Header problems fail the whole import before
    /// any row is attempted.
    pub async fn import_str(&self, text: &str) -> SyncResult<ImportReport> {
        let mut records = parse_records(text)?.into_iter();
        let header = match records.next() {
            Some(record) => TemplateHeader::parse(&record)?,
            None => {
                return Err(SyncError::Template {
                    line: 1,
                    reason: "missing header row".into(),
                });
            }
        };

        let rows: Vec<Record> = records.collect();
        let mut report = ImportReport {
            total_rows: rows.len(),
            ..ImportReport::default()
        };

        for (index, record) in rows.iter().enumerate() {
            let row = index + 1;
            let (id, result) = match header.build_entry(record) {
                Ok(entry) => {
                    let id = entry.id.clone();
                    (Some(id), self.orchestrator.insert_entry(entry).await)
                }
                Err(e) => (None, Err(SyncError::Validation(e))),
            };

            let halt = match &result {
                Ok(_) => false,
                Err(SyncError::Validation(e)) => {
                    warn!("row {row} (line {}): {e}", record.line);
                    true
                }
                Err(e) => {
                    warn!("row {row} (line {}): {e}", record.line);
                    self.policy.stop_on_store_error
                }
            };

            report.outcomes.push(RowOutcome {
                row,
                line: record.line,
                id,
                result,
            });
            if halt {
                report.halted_at = Some(row);
                break;
            }
        }

        info!(
            "import finished: {} of {} rows committed",
            report.committed(),
            report.total_rows
        );
        Ok(report)
    }
}

// ── Template parsing ─────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct Record {
    line: usize,
    fields: Vec<String>,
}

/// Column layout of a template, taken from its header row.
#[derive(Debug)]
struct TemplateHeader {
    columns: Vec<Field>,
}

impl TemplateHeader {
    /// Trailing blank header cells, as spreadsheet exports often add, are
    /// ignored.
    fn parse(record: &Record) -> SyncResult<Self> {
        let width = record
            .fields
            .iter()
            .rposition(|f| !f.trim().is_empty())
            .map_or(0, |last| last + 1);
        let mut columns = Vec::with_capacity(width);
        for raw in &record.fields[..width] {
            let name = raw.trim();
            let field = Field::from_column(name).ok_or_else(|| SyncError::Template {
                line: record.line,
                reason: format!("unknown column `{name}`"),
            })?;
            if columns.contains(&field) {
                return Err(SyncError::Template {
                    line: record.line,
                    reason: format!("duplicate column `{name}`"),
                });
            }
            columns.push(field);
        }

        if let Some(missing) = Field::ALL
            .into_iter()
            .find(|f| f.is_required() && !columns.contains(f))
        {
            return Err(SyncError::Template {
                line: record.line,
                reason: format!("missing required column `{}`", missing.column()),
            });
        }
        Ok(Self { columns })
    }

    /// Builds a validated entry from one row, checking id, then value, then
    /// metadata in column order.
    fn build_entry(&self, record: &Record) -> Result<Entry, ValidationError> {
        let width = self.columns.len();
        let mut fields = record.fields.as_slice();
        if fields.len() > width && fields[width..].iter().all(|f| f.trim().is_empty()) {
            fields = &fields[..width];
        }
        if fields.len() != width {
            let at = fields.len().min(width - 1);
            return Err(ValidationError::malformed(
                self.columns[at],
                format!("row has {} fields, header has {width}", fields.len()),
            ));
        }

        let mut id = "";
        let mut value = "";
        let mut draft = MetadataDraft::default();
        for (field, raw) in self.columns.iter().zip(fields) {
            match field {
                Field::Id => id = raw.as_str(),
                Field::Value => value = raw.as_str(),
                other => draft.set(*other, raw.as_str()),
            }
        }

        let id = EntryId::parse(id)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Missing(Field::Value));
        }
        let metadata = draft.build()?;
        Entry::new(id, value, metadata)
    }
}

/// Splits RFC 4180 text into records. Quoted fields may span lines; blank
/// lines are skipped.
fn parse_records(text: &str) -> SyncResult<Vec<Record>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                end_record(&mut records, &mut fields, &mut field, quoted, record_line);
                quoted = false;
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(SyncError::Template {
            line: record_line,
            reason: "unterminated quoted field".into(),
        });
    }
    end_record(&mut records, &mut fields, &mut field, quoted, record_line);
    Ok(records)
}

fn end_record(
    records: &mut Vec<Record>,
    fields: &mut Vec<String>,
    field: &mut String,
    quoted: bool,
    line: usize,
) {
    let blank = fields.is_empty() && !quoted && field.trim().is_empty();
    let last = std::mem::take(field);
    if blank {
        return;
    }
    fields.push(last);
    records.push(Record {
        line,
        fields: std::mem::take(fields),
    });
}

//! Flat-file table storage.
//!
//! A table is a CSV file with the fixed [`TABLE_COLUMNS`] header that only ever
//! grows. Merging reads the titles already present, then appends the incoming
//! records whose title is not among them.
//!
//! There is no locking: two processes merging into the same file at once can
//! both append the same title.

use crate::error::{BibmergeError, Result};
use crate::record::{UnifiedRecord, TABLE_COLUMNS, TITLE_COLUMN};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name offered when the operator creates a new table
pub const DEFAULT_TABLE_NAME: &str = "combined_data.csv";

/// Extension that makes a file discoverable as a table
const TABLE_EXTENSION: &str = "csv";

/// Outcome of one merge into a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// The file did not exist before this merge
    pub created: bool,
    /// Rows written, excluding the header
    pub appended: usize,
    /// Incoming records dropped because their title was already stored
    pub skipped: usize,
    /// The existing file had no `Title` column, so nothing was deduplicated
    pub schema_warning: bool,
}

/// A discoverable table in the data directory
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub size_bytes: u64,
    /// Local modification time, `YYYY-MM-DD HH:MM:SS`
    pub modified: String,
}

/// Merge `records` into the table at `path`, appending only unseen titles.
///
/// Records are checked against the titles stored before this call only; two
/// incoming records sharing a title are both appended. Empty titles are never
/// treated as duplicates.
///
/// # Errors
///
/// Any I/O or CSV failure on the table is returned as-is.
pub fn merge_into_table(path: &Path, records: &[UnifiedRecord]) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    let existed = path.is_file();
    let existing_len = if existed { std::fs::metadata(path)?.len() } else { 0 };

    let existing_titles = if existing_len > 0 {
        match read_existing_titles(path)? {
            Some(titles) => titles,
            None => {
                warn!(
                    path = %path.display(),
                    "'{}' column is missing in table; existing rows will not be deduplicated",
                    TITLE_COLUMN
                );
                report.schema_warning = true;
                HashSet::new()
            }
        }
    } else {
        HashSet::new()
    };
    debug!(existing = existing_titles.len(), "Loaded existing titles");

    let needs_newline = existing_len > 0 && !ends_with_newline(path)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    report.created = !existed;
    if needs_newline {
        file.write_all(b"\n")?;
    }
    let needs_header = file.metadata()?.len() == 0;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        wtr.write_record(TABLE_COLUMNS)?;
    }

    for record in records {
        if !record.title.is_empty() && existing_titles.contains(&record.title) {
            debug!(title = %record.title, "Skipping duplicate title");
            report.skipped += 1;
            continue;
        }
        wtr.serialize(record)?;
        report.appended += 1;
    }

    wtr.flush()?;

    let repeated = repeated_titles(records, &existing_titles);
    if repeated > 0 {
        warn!(
            repeated = repeated,
            "Batch contained repeated titles; all copies were appended"
        );
    }

    info!(
        path = %path.display(),
        created = report.created,
        appended = report.appended,
        skipped = report.skipped,
        "Table updated"
    );

    Ok(report)
}

/// Titles stored in the table, or `None` when it has no `Title` column.
fn read_existing_titles(path: &Path) -> Result<Option<HashSet<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let Some(title_idx) = rdr.headers()?.iter().position(|h| h == TITLE_COLUMN) else {
        return Ok(None);
    };

    let mut titles = HashSet::new();
    for row in rdr.records() {
        let row = row?;
        if let Some(title) = row.get(title_idx).filter(|t| !t.is_empty()) {
            titles.insert(title.to_string());
        }
    }

    Ok(Some(titles))
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Non-empty, previously unseen titles that appear more than once in `records`
fn repeated_titles(records: &[UnifiedRecord], existing: &HashSet<String>) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if !record.title.is_empty() && !existing.contains(&record.title) {
            *counts.entry(record.title.as_str()).or_default() += 1;
        }
    }
    counts.values().filter(|&&n| n > 1).map(|n| n - 1).sum()
}

/// Resolve a table name inside `dir`.
///
/// Only a plain `<name>.csv` file name is accepted; anything with a path
/// separator or a parent reference is rejected.
pub fn resolve_table_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    let candidate = Path::new(name);

    let is_plain = !name.is_empty()
        && candidate.file_name().and_then(|f| f.to_str()) == Some(name)
        && !name.contains(['/', '\\']);
    if !is_plain {
        return Err(BibmergeError::Validation(format!(
            "Invalid table name: '{}'",
            name
        )));
    }

    let has_stem = candidate
        .file_stem()
        .is_some_and(|stem| !stem.is_empty() && stem != name);
    let has_extension = candidate
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION));
    if !has_stem || !has_extension {
        return Err(BibmergeError::Validation(format!(
            "Table name must end with .{}: '{}'",
            TABLE_EXTENSION, name
        )));
    }

    Ok(dir.join(name))
}

/// List `.csv` tables in `dir`, sorted by name.
pub fn list_tables(dir: &Path) -> Result<Vec<TableInfo>> {
    let mut tables = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_table = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION));
        if !is_table {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };

        let modified = metadata
            .modified()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        tables.push(TableInfo {
            name: name.to_string(),
            size_bytes: metadata.len(),
            modified,
        });
    }

    tables.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tables)
}

/// Raw bytes of an existing table, for download.
pub fn read_table(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = resolve_table_path(dir, name)?;
    if !path.is_file() {
        return Err(BibmergeError::NotFound(name.to_string()));
    }
    Ok(std::fs::read(&path)?)
}

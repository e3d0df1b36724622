//! CSV rollup for archiving the entry log.
//!
//! The JSONL log is appended to a CSV history file and then renamed out of
//! the way, so a crash between the two steps never loses an entry. The log
//! stays exclusively locked throughout, which holds back appends until the
//! rename is done.

use crate::store::{is_current, parse_entries};
use crate::{Result, SubmittedEntry};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A row in the CSV archive
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub entry_type: String,
    pub reading: String,
    pub administering_party: String,
    pub entry_time: String,
    pub submitted_at: String,
    pub note: Option<String>,
}

impl From<&SubmittedEntry> for CsvRow {
    fn from(entry: &SubmittedEntry) -> Self {
        CsvRow {
            id: entry.id.to_string(),
            entry_type: entry.entry_type.to_string(),
            reading: entry.reading.to_string(),
            administering_party: entry.administering_party.clone(),
            entry_time: entry.entry_time.to_rfc3339(),
            submitted_at: entry.submitted_at.to_rfc3339(),
            note: entry.note.clone(),
        }
    }
}

/// Roll up log entries into CSV and archive the log
///
/// Holds an exclusive lock on the log for the whole sequence:
/// 1. Reads all entries from the log
/// 2. Appends them to the CSV file (headers only if the file is new)
/// 3. Syncs the CSV to disk
/// 4. Renames the log to a uniquely named `.processed` file
///
/// Returns the number of entries written. A missing or empty log is left
/// as it is and yields 0.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let Some(wal) = lock_live_log(wal_path)? else {
        tracing::info!("No entry log at {:?} to roll up", wal_path);
        return Ok(0);
    };

    let result = archive_locked(&wal, wal_path, csv_path);
    wal.unlock()?;
    result
}

/// Open and exclusively lock the file currently at `wal_path`
fn lock_live_log(wal_path: &Path) -> Result<Option<File>> {
    loop {
        let file = match File::open(wal_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        file.lock_exclusive()?;
        if is_current(&file, wal_path)? {
            return Ok(Some(file));
        }
        file.unlock()?;
    }
}

fn archive_locked(wal: &File, wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let entries = parse_entries(wal)?;

    if entries.is_empty() {
        tracing::info!("No entries in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for entry in &entries {
        writer.serialize(CsvRow::from(entry))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} entries to CSV", entries.len());

    let processed_path = processed_path_for(wal_path);
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived entry log to {:?}", processed_path);

    Ok(entries.len())
}

/// `<log name>.<UTC timestamp>.processed`, never an existing file
fn processed_path_for(wal_path: &Path) -> PathBuf {
    let name = wal_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");

    let mut candidate = wal_path.with_file_name(format!("{}.{}.processed", name, stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = wal_path.with_file_name(format!("{}.{}-{}.processed", name, stamp, n));
        n += 1;
    }
    candidate
}

/// Remove every `.processed` log in the given directory
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed logs", count);
    }

    Ok(count)
}

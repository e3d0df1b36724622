//! Entry history loading.
//!
//! Recent entries come from both the live JSONL log and the CSV archive.

use crate::csv_rollup::CsvRow;
use crate::{EntryType, Error, Result, SubmittedEntry};
use chrono::{DateTime, TimeDelta, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid date {:?}: {}", value, e)))
}

impl TryFrom<CsvRow> for SubmittedEntry {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?;

        Ok(SubmittedEntry {
            id,
            reading: row.reading.parse()?,
            administering_party: row.administering_party,
            entry_type: row.entry_type.parse()?,
            entry_time: parse_timestamp(&row.entry_time)?,
            submitted_at: parse_timestamp(&row.submitted_at)?,
            note: row.note.filter(|n| !n.is_empty()),
        })
    }
}

/// Earliest entry time inside a window of `days` days ending now
fn cutoff_for(days: i64) -> Result<DateTime<Utc>> {
    if days <= 0 {
        return Err(Error::Validation(format!(
            "history window must be positive, got {} days",
            days
        )));
    }
    TimeDelta::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| {
            Error::Validation(format!("history window of {} days is out of range", days))
        })
}

/// Load entries taken within the last `days` days from both log and CSV
///
/// Returns entries sorted by entry time (newest first), with entries that
/// appear in both sources counted once. A window that is not positive or
/// reaches past the representable date range is a validation error.
pub fn load_recent_entries(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<SubmittedEntry>> {
    let cutoff = cutoff_for(days)?;
    let mut entries = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for entry in crate::store::read_entries(wal_path)? {
            if entry.entry_time >= cutoff && seen_ids.insert(entry.id) {
                entries.push(entry);
            }
        }
        tracing::debug!("Loaded {} entries from log", entries.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for entry in load_entries_from_csv(csv_path)? {
            if entry.entry_time >= cutoff && seen_ids.insert(entry.id) {
                entries.push(entry);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} entries from CSV", csv_count);
    }

    entries.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));

    tracing::info!(
        "Loaded {} total entries from last {} days",
        entries.len(),
        days
    );

    Ok(entries)
}

/// Load all entries from a CSV archive
fn load_entries_from_csv(path: &Path) -> Result<Vec<SubmittedEntry>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match SubmittedEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(entries)
}

/// Find the most recent entry of the given type
pub fn find_last_entry_by_type(
    entries: &[SubmittedEntry],
    entry_type: EntryType,
) -> Option<&SubmittedEntry> {
    // Entries are sorted newest first
    entries.iter().find(|e| e.entry_type == entry_type)
}

//! Append-only entry store.
//!
//! Submitted entries are appended to a JSONL (JSON Lines) log with file
//! locking so that concurrent `itrack` processes never interleave records.
//! Rollup renames the log away while holding the same lock, so an appender
//! that wins the lock afterwards must check it still holds the live file.

use crate::{Result, SubmittedEntry};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Destination for submitted entries
pub trait EntrySink {
    fn append(&mut self, entry: &SubmittedEntry) -> Result<()>;
}

/// JSONL-based entry store with file locking
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Create a new JSONL store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Open the live log with an exclusive lock held
    ///
    /// Retries when the file was renamed away while we waited for the lock.
    fn open_locked(&self) -> Result<File> {
        loop {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;

            file.lock_exclusive()?;

            if is_current(&file, &self.path)? {
                return Ok(file);
            }

            file.unlock()?;
            tracing::debug!("Entry log {:?} was archived while waiting, reopening", self.path);
        }
    }
}

/// Whether `path` still names the file behind `file`
pub(crate) fn is_current(file: &File, path: &Path) -> Result<bool> {
    let on_disk = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let held = file.metadata()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(held.dev() == on_disk.dev() && held.ino() == on_disk.ino())
    }

    #[cfg(not(unix))]
    {
        Ok(held.len() == on_disk.len() && held.modified().ok() == on_disk.modified().ok())
    }
}

impl EntrySink for JsonlStore {
    fn append(&mut self, entry: &SubmittedEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = self.open_locked()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended entry {} to {:?}", entry.id, self.path);
        Ok(())
    }
}

/// Read all entries from a JSONL log
///
/// A missing file is an empty log. Lines that fail to parse are skipped.
pub fn read_entries(path: &Path) -> Result<Vec<SubmittedEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let entries = parse_entries(&file);
    file.unlock()?;

    let entries = entries?;
    tracing::debug!("Read {} entries from {:?}", entries.len(), path);
    Ok(entries)
}

/// Parse JSONL records from an already opened (and locked) log
pub(crate) fn parse_entries(source: impl Read) -> Result<Vec<SubmittedEntry>> {
    let reader = BufReader::new(source);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SubmittedEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(entries)
}

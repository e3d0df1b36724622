//! User profile persistence with file locking.
//!
//! Writers serialize on an exclusive lock over a `<profile>.lock` sidecar,
//! since the profile file itself is replaced on every save.

use crate::{Error, Result, UserProfile};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Log a failed step of `load` and turn it into `None`
fn usable<T>(path: &Path, step: &str, result: std::io::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Unable to {} profile {:?}: {}. Using defaults.", step, path, e);
            None
        }
    }
}

/// Exclusive writer lock for a profile, released on drop
struct WriterLock {
    file: File,
}

impl WriterLock {
    fn acquire(path: &Path) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("Profile path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path_for(path))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release profile lock: {}", e);
        }
    }
}

impl UserProfile {
    /// Load the profile with shared locking
    ///
    /// Returns the default profile if the file doesn't exist or can't be
    /// read or parsed; the problem is logged.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No profile found, using default profile");
            return Ok(Self::default());
        }

        let Some(file) = usable(path, "open", File::open(path)) else {
            return Ok(Self::default());
        };
        if usable(path, "lock", file.lock_shared()).is_none() {
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let unlocked = usable(path, "unlock", file.unlock());
        if usable(path, "read", read).is_none() || unlocked.is_none() {
            return Ok(Self::default());
        }

        match serde_json::from_str::<UserProfile>(&contents) {
            Ok(profile) => {
                tracing::debug!("Loaded profile from {:?}", path);
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!("Failed to parse profile {:?}: {}. Using defaults.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the profile atomically
    ///
    /// Takes the writer lock, writes to a temp file in the same directory,
    /// syncs it, then renames it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = WriterLock::acquire(path)?;
        self.write_atomic(path)
    }

    fn write_atomic(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("Profile path {:?} has no parent", path)))?;

        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved profile to {:?}", path);
        Ok(())
    }

    /// Load the profile, modify it, and save it back
    ///
    /// The writer lock is held across all three steps, so concurrent
    /// updates to different fields all survive.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut UserProfile) -> Result<()>,
    {
        let _lock = WriterLock::acquire(path)?;
        let mut profile = Self::load(path)?;
        f(&mut profile)?;
        profile.write_atomic(path)?;
        Ok(profile)
    }
}

//! Brewery state persistence with file locking.
//!
//! The whole store is one JSON document, rewritten atomically after every
//! successful command.

use crate::{Brewery, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl Brewery {
    /// Load the store from a file with shared locking
    ///
    /// Returns `fallback()` if the file doesn't exist. If the file cannot be
    /// read or does not hold a store, logs a warning and returns `fallback()`.
    pub fn load_or_else<F>(path: &Path, fallback: F) -> Result<Self>
    where
        F: FnOnce() -> Brewery,
    {
        if !path.exists() {
            tracing::info!("No state file found, starting a new brewery");
            return Ok(fallback());
        }

        let brewery = read_locked(path)
            .map_err(Error::Io)
            .and_then(|contents| Ok(serde_json::from_str::<Brewery>(&contents)?));

        match brewery {
            Ok(brewery) => {
                for problem in brewery.invariant_violations() {
                    tracing::warn!("State file {:?}: {}", path, problem);
                }
                tracing::debug!("Loaded brewery state from {:?}", path);
                Ok(brewery)
            }
            Err(e) => {
                tracing::warn!("Unusable state file {:?}: {}. Starting fresh.", path, e);
                Ok(fallback())
            }
        }
    }

    /// Save the store to a file with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "state path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved brewery state to {:?}", path);
        Ok(())
    }
}

/// Read a whole file under a shared lock
fn read_locked(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let unlocked = file.unlock();
    read?;
    unlocked?;
    Ok(contents)
}

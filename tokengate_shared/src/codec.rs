//! Snapshot persistence for a [`ConcurrentStore`].
//!
//! A store is saved as a single flat JSON object (`{"key": "value", ...}`).
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so a concurrent `load` sees either the old or the
//! new snapshot, never a partial one.

use crate::store::ConcurrentStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt store file '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode store snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Loads a store from `path`.
///
/// A missing file yields an empty store (first run). A file that exists but
/// cannot be read or decoded is an error; callers must not start with an
/// unknown data set.
pub fn load(path: &Path) -> Result<ConcurrentStore, PersistenceError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("No store file at '{}', starting empty", path.display());
            return Ok(ConcurrentStore::new());
        }
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let snapshot: BTreeMap<String, String> =
        serde_json::from_slice(&contents).map_err(|source| PersistenceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ConcurrentStore::from_snapshot(snapshot))
}

/// Saves a point-in-time snapshot of `store` to `path`.
///
/// The store's lock is held only while copying the entries; encoding and
/// file I/O happen afterwards.
pub fn save(path: &Path, store: &ConcurrentStore) -> Result<(), PersistenceError> {
    let snapshot = store.snapshot();
    let encoded = serde_json::to_vec_pretty(&snapshot).map_err(PersistenceError::Encode)?;
    write_atomic(path, &encoded).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// A store file location with a human-readable name for log output.
#[derive(Debug, Clone)]
pub struct StoreFile {
    pub name: &'static str,
    pub path: PathBuf,
}

impl StoreFile {
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }

    pub fn load(&self) -> Result<ConcurrentStore, PersistenceError> {
        let store = load(&self.path)?;
        tracing::info!(
            "Loaded {} store from '{}' ({} entries)",
            self.name,
            self.path.display(),
            store.len()
        );
        Ok(store)
    }

    pub fn save(&self, store: &ConcurrentStore) -> Result<(), PersistenceError> {
        save(&self.path, store)?;
        tracing::debug!("Saved {} store to '{}'", self.name, self.path.display());
        Ok(())
    }
}

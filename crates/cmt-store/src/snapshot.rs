//! Durable snapshot backends
//!
//! A backend stores one JSON document per reserved key. Durability is best
//! effort: every operation returns a `Result`, and the store decides what a
//! failure means (it logs and carries on).

use crate::error::SnapshotError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Storage for serialized snapshots
pub trait SnapshotBackend: Send + Sync + Debug {
    /// Read the raw document stored under `key`, `None` if never written
    ///
    /// # Errors
    /// Returns [`SnapshotError`] when the storage cannot be accessed.
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError>;

    /// Replace the document stored under `key`
    ///
    /// # Errors
    /// Returns [`SnapshotError`] when the document cannot be written.
    fn save(&self, key: &str, document: &str) -> Result<(), SnapshotError>;
}

/// One `<key>.json` file per key inside a state directory
///
/// Writes go to `<key>.json.tmp` first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    dir: PathBuf,
}

impl JsonFileSnapshot {
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path backing `key`
    ///
    /// # Errors
    /// Rejects empty keys and keys that would escape the state directory.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, SnapshotError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(SnapshotError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotBackend for JsonFileSnapshot {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::io(path, e)),
        }
    }

    fn save(&self, key: &str, document: &str) -> Result<(), SnapshotError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::io(&self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, document).map_err(|e| SnapshotError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| SnapshotError::io(&path, e))?;
        Ok(())
    }
}

/// In-process backend for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    documents: Mutex<HashMap<String, String>>,
}

impl MemorySnapshot {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, bypassing serialization
    pub fn insert_raw(&self, key: impl Into<String>, document: impl Into<String>) {
        self.documents.lock().insert(key.into(), document.into());
    }

    /// Raw document currently stored under `key`
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.documents.lock().get(key).cloned()
    }
}

impl SnapshotBackend for MemorySnapshot {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, document: &str) -> Result<(), SnapshotError> {
        self.insert_raw(key, document);
        Ok(())
    }
}

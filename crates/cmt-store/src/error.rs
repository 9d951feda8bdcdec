//! Error types for the state layer
//!
//! Only durability can fail here. Callers of the store and log never see
//! these: they are logged and the in-memory flow continues.

use std::path::PathBuf;

/// Snapshot read/write failure
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Filesystem access failed
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be encoded
    #[error("snapshot encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Key cannot be mapped to a storage location
    #[error("invalid snapshot key: {0}")]
    InvalidKey(String),

    /// Backend refused the operation
    #[error("snapshot backend unavailable: {0}")]
    Unavailable(String),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

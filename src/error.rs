//! Error taxonomy for the indexing and search engine.
//!
//! - [`LocatorError::Storage`] and [`LocatorError::Validation`] propagate to the caller and
//!   abort the current operation only.
//! - [`LocatorError::Permission`] is produced for unreadable entries during a directory walk;
//!   the walker logs it and skips the entry, as it does for every error where
//!   [`LocatorError::is_skippable`] holds.
//! - Watcher event failures are logged per path and never stop the event loop.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(PathBuf),

    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocatorError>;

impl LocatorError {
    /// Classifies an IO error raised while touching `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::Permission(path.to_path_buf()),
            _ => Self::Io { path: path.to_path_buf(), source },
        }
    }

    /// True for per-entry errors a directory walk recovers from by skipping the entry.
    ///
    /// Storage errors are not skippable: every later commit would hit the same database.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Permission(_) | Self::NotFound(_) | Self::Io { .. } | Self::Validation(_)
        )
    }
}

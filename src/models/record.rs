use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a stored record (row id of the `files` table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

/// Metadata for one indexed file or directory, keyed by absolute path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    /// `None` for directories
    pub size: Option<u64>,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    /// Lowercase extension without the dot
    pub file_type: Option<String>,
    pub is_directory: bool,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub indexed_time: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a record with empty metadata and zeroed access statistics
    pub fn new(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        let name = display_name(&path);
        let file_type = if is_directory { None } else { extension_of(&path) };
        Self {
            path,
            name,
            size: None,
            created_time: None,
            modified_time: None,
            file_type,
            is_directory,
            access_count: 0,
            last_accessed: None,
            indexed_time: Utc::now(),
        }
    }
}

/// Final path component, or the whole path for roots like `/`
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Lowercase extension without the dot (`None` for dotfiles and extensionless names)
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub(crate) fn to_millis(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LocatorError, Result};
use crate::utils::normalize_extension;

/// Filter fields accepted inline in a query (`field:value`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// File extension, with or without the dot
    Type,
    /// `file` or `dir`
    Kind,
    /// Substring of the full path (supports ~)
    Path,
    /// Modified on or after a date (YYYY-MM-DD)
    Since,
}

/// Restricts results to files, directories, or neither
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Any,
    FilesOnly,
    DirectoriesOnly,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::FilesOnly => "files",
            Self::DirectoriesOnly => "dirs",
        }
    }
}

/// Restrictions applied to search candidates
///
/// - Values of the same field are OR'd: `type:rs type:md` → rs OR md
/// - Different fields are AND'd: `type:rs kind:file` → rs AND file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Lowercase extensions without the dot; empty means any type
    pub file_types: BTreeSet<String>,
    pub kind: EntryKind,
    /// Path substrings, case-insensitive
    pub path_contains: Vec<String>,
    pub modified_since: Option<NaiveDate>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_only() -> Self {
        Self { kind: EntryKind::FilesOnly, ..Self::default() }
    }

    pub fn directories_only() -> Self {
        Self { kind: EntryKind::DirectoriesOnly, ..Self::default() }
    }

    pub fn with_type(mut self, extension: &str) -> Self {
        self.add_type(extension);
        self
    }

    pub fn add_type(&mut self, extension: &str) {
        let extension = normalize_extension(extension);
        if !extension.is_empty() {
            self.file_types.insert(extension);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_types.is_empty()
            && self.kind == EntryKind::Any
            && self.path_contains.is_empty()
            && self.modified_since.is_none()
    }

    /// Combines two filter sets, e.g. CLI flags with inline query filters
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Validation`] when the two sets ask for different
    /// entry kinds or different dates.
    pub fn merge(mut self, other: SearchFilters) -> Result<Self> {
        self.file_types.extend(other.file_types);
        self.path_contains.extend(other.path_contains);

        self.kind = match (self.kind, other.kind) {
            (EntryKind::Any, kind) | (kind, EntryKind::Any) => kind,
            (a, b) if a == b => a,
            (a, b) => {
                return Err(LocatorError::Validation(format!(
                    "Conflicting entry kinds: {} and {}",
                    a.as_str(),
                    b.as_str()
                )));
            }
        };

        self.modified_since = match (self.modified_since, other.modified_since) {
            (Some(a), Some(b)) if a != b => {
                return Err(LocatorError::Validation(format!(
                    "Conflicting since dates: {} and {}",
                    a, b
                )));
            }
            (a, b) => a.or(b),
        };

        Ok(self)
    }
}

/// Stable text form used in cache signatures
impl fmt::Display for SearchFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<&str> = self.file_types.iter().map(String::as_str).collect();
        let mut paths: Vec<String> = self.path_contains.iter().map(|p| p.to_lowercase()).collect();
        paths.sort();
        paths.dedup();

        write!(
            f,
            "types={};kind={};paths={}",
            types.join(","),
            self.kind.as_str(),
            paths.join(",")
        )?;
        if let Some(since) = self.modified_since {
            write!(f, ";since={}", since)?;
        }
        Ok(())
    }
}

/// A query split into search text and inline filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub text: String,
    pub filters: SearchFilters,
}

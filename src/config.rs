use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LocatorError, Result};
use crate::utils::{default_database_path, normalize_extension};

/// Top-level configuration, persisted as JSON
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub indexing: IndexingConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Index entries whose name starts with `.`
    pub index_hidden: bool,
    /// Record directories as well as files
    pub index_directories: bool,
    /// Extensions that are never indexed (with or without the leading dot)
    pub excluded_extensions: Vec<String>,
    /// Path segments that exclude everything below them
    pub excluded_paths: Vec<String>,
    /// Roots monitored by `findex monitor` when none are given
    pub watch_paths: Vec<PathBuf>,
    /// Roots indexed by `findex index` when no path is given, and by `FileLocator::auto_index`
    pub auto_index_paths: Vec<PathBuf>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            index_hidden: false,
            index_directories: true,
            excluded_extensions: ["tmp", "temp", "log", "cache", "lock"]
                .into_iter()
                .map(String::from)
                .collect(),
            excluded_paths: [".git", ".svn", "node_modules", "__pycache__", ".DS_Store"]
                .into_iter()
                .map(String::from)
                .collect(),
            watch_paths: Vec::new(),
            auto_index_paths: Vec::new(),
        }
    }
}

impl IndexingConfig {
    /// Excluded extensions, lowercase and without the dot
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .excluded_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enable_fuzzy: bool,
    /// Minimum combined similarity for a fuzzy match, in `0.0..=1.0`
    pub fuzzy_threshold: f64,
    pub max_results: usize,
    pub cache_results: bool,
    /// Cache entries untouched for longer than this are purged by `cleanup_cache`
    pub cache_max_age_days: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enable_fuzzy: true,
            fuzzy_threshold: 0.6,
            max_results: 50,
            cache_results: true,
            cache_max_age_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; `None` selects the default under the findex home directory
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when it is missing
    ///
    /// Environment overrides are applied on top of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if the
    /// resulting values fail [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let json = fs::read_to_string(path).map_err(|e| LocatorError::from_io(path, e))?;
            serde_json::from_str(&json)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LocatorError::from_io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| LocatorError::from_io(&temp, e))?;
        fs::rename(&temp, path).map_err(|e| LocatorError::from_io(path, e))?;
        Ok(())
    }

    /// Resolved database location
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.search.fuzzy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LocatorError::Validation(format!(
                "search.fuzzy_threshold must be within 0.0..=1.0, got {}",
                threshold
            )));
        }
        if self.search.max_results == 0 {
            return Err(LocatorError::Validation(
                "search.max_results must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `FINDEX_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup; unparsable values are logged and ignored
    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("FINDEX_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("FINDEX_FUZZY_THRESHOLD") {
            match value.parse() {
                Ok(threshold) => self.search.fuzzy_threshold = threshold,
                Err(_) => warn!("Ignoring invalid FINDEX_FUZZY_THRESHOLD: {}", value),
            }
        }
        if let Some(value) = lookup("FINDEX_MAX_RESULTS") {
            match value.parse() {
                Ok(max) => self.search.max_results = max,
                Err(_) => warn!("Ignoring invalid FINDEX_MAX_RESULTS: {}", value),
            }
        }
        if let Some(value) = lookup("FINDEX_INDEX_HIDDEN") {
            match parse_bool(&value) {
                Some(flag) => self.indexing.index_hidden = flag,
                None => warn!("Ignoring invalid FINDEX_INDEX_HIDDEN: {}", value),
            }
        }
        if let Some(value) = lookup("FINDEX_CACHE_RESULTS") {
            match parse_bool(&value) {
                Some(flag) => self.search.cache_results = flag,
                None => warn!("Ignoring invalid FINDEX_CACHE_RESULTS: {}", value),
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

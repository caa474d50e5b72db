//! Decides which paths are admitted into the index

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path};

use crate::config::IndexingConfig;
use crate::models::extension_of;

/// Why a path was kept out of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    Hidden,
    ExcludedPath,
    ExcludedExtension,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Hidden => "hidden",
            Self::ExcludedPath => "excluded path",
            Self::ExcludedExtension => "excluded extension",
        };
        f.write_str(text)
    }
}

/// Hidden-entry, path-segment and extension rules, evaluated in that order
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    index_hidden: bool,
    index_directories: bool,
    excluded_extensions: HashSet<String>,
    excluded_paths: HashSet<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::from_config(&IndexingConfig::default())
    }
}

impl ExclusionPolicy {
    pub fn from_config(config: &IndexingConfig) -> Self {
        Self {
            index_hidden: config.index_hidden,
            index_directories: config.index_directories,
            excluded_extensions: config.normalized_extensions().into_iter().collect(),
            excluded_paths: config.excluded_paths.iter().cloned().collect(),
        }
    }

    pub fn index_directories(&self) -> bool {
        self.index_directories
    }

    /// Sorted excluded extensions, for reporting
    pub fn excluded_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.excluded_extensions.iter().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Sorted excluded path tokens, for reporting
    pub fn excluded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.excluded_paths.iter().cloned().collect();
        paths.sort();
        paths
    }

    /// First rule that rejects `path`, if any
    ///
    /// Only the final component is checked for hidden-ness; the extension rule
    /// applies to files only.
    pub fn exclusion_reason(&self, path: &Path, is_directory: bool) -> Option<ExclusionReason> {
        let name = path.file_name().map(|name| name.to_string_lossy());
        if !self.index_hidden && name.as_deref().is_some_and(is_hidden_name) {
            return Some(ExclusionReason::Hidden);
        }

        if self.has_excluded_segment(path) {
            return Some(ExclusionReason::ExcludedPath);
        }

        if !is_directory
            && let Some(extension) = extension_of(path)
            && self.excluded_extensions.contains(&extension)
        {
            return Some(ExclusionReason::ExcludedExtension);
        }

        None
    }

    pub fn excludes(&self, path: &Path, is_directory: bool) -> bool {
        self.exclusion_reason(path, is_directory).is_some()
    }

    /// Like [`excludes`](Self::excludes), but also rejects paths below a hidden
    /// directory inside `root`
    ///
    /// Watcher events arrive for the whole subtree of a monitored root, including
    /// directories a walk would have pruned.
    pub fn excludes_under(&self, root: &Path, path: &Path, is_directory: bool) -> bool {
        if !self.index_hidden
            && let Ok(relative) = path.strip_prefix(root)
            && relative.components().any(|component| match component {
                Component::Normal(segment) => is_hidden_name(&segment.to_string_lossy()),
                _ => false,
            })
        {
            return true;
        }
        self.excludes(path, is_directory)
    }

    fn has_excluded_segment(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(segment) => {
                self.excluded_paths.contains(segment.to_string_lossy().as_ref())
            }
            _ => false,
        })
    }
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_files_excluded_by_default() {
        let policy = ExclusionPolicy::default();
        assert_eq!(
            policy.exclusion_reason(Path::new("/proj/.env"), false),
            Some(ExclusionReason::Hidden)
        );
        assert!(!policy.excludes(Path::new("/proj/env"), false));
    }

    #[test]
    fn test_hidden_files_admitted_when_enabled() {
        let config = IndexingConfig { index_hidden: true, ..IndexingConfig::default() };
        let policy = ExclusionPolicy::from_config(&config);
        assert!(!policy.excludes(Path::new("/proj/.env"), false));
        // .git is still an excluded segment
        assert_eq!(
            policy.exclusion_reason(Path::new("/proj/.git/config"), false),
            Some(ExclusionReason::ExcludedPath)
        );
    }

    #[test]
    fn test_excluded_segment_anywhere_in_path() {
        let policy = ExclusionPolicy::default();
        assert!(policy.excludes(Path::new("/proj/node_modules/lib/index.js"), false));
        assert!(policy.excludes(Path::new("/proj/node_modules"), true));
        assert!(!policy.excludes(Path::new("/proj/node_modules_backup/index.js"), false));
    }

    #[test]
    fn test_excluded_extensions_are_normalized() {
        let config = IndexingConfig {
            excluded_extensions: vec![".BAK".to_string()],
            ..IndexingConfig::default()
        };
        let policy = ExclusionPolicy::from_config(&config);
        assert_eq!(
            policy.exclusion_reason(Path::new("/proj/old.bak"), false),
            Some(ExclusionReason::ExcludedExtension)
        );
        assert!(!policy.excludes(Path::new("/proj/debug.log"), false));
    }

    #[test]
    fn test_extension_rule_skips_directories() {
        let policy = ExclusionPolicy::default();
        assert!(policy.excludes(Path::new("/var/app.log"), false));
        assert!(!policy.excludes(Path::new("/var/app.log"), true));
    }

    #[test]
    fn test_rule_order_hidden_first() {
        let policy = ExclusionPolicy::default();
        assert_eq!(
            policy.exclusion_reason(Path::new("/proj/node_modules/.cache.tmp"), false),
            Some(ExclusionReason::Hidden)
        );
    }

    #[test]
    fn test_excludes_under_hidden_directory() {
        let policy = ExclusionPolicy::default();
        let root = Path::new("/home/me/proj");
        assert!(policy.excludes_under(root, Path::new("/home/me/proj/.venv/lib/site.py"), false));
        assert!(!policy.excludes_under(root, Path::new("/home/me/proj/src/site.py"), false));

        // hidden ancestors above the root do not count
        let hidden_root = Path::new("/home/me/.config");
        assert!(!policy.excludes_under(hidden_root, Path::new("/home/me/.config/app.json"), false));
    }

    #[test]
    fn test_reporting_lists_are_sorted() {
        let policy = ExclusionPolicy::default();
        assert_eq!(policy.excluded_extensions(), vec!["cache", "lock", "log", "temp", "tmp"]);
        assert!(policy.excluded_paths().contains(&"__pycache__".to_string()));
    }
}

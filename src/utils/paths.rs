use std::borrow::Cow;
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{LocatorError, Result};

/// Number of non-empty segments in a path, splitting on both `/` and `\`
///
/// Trailing, doubled and mixed separators do not change the count.
///
/// # Examples
///
/// ```
/// use findex::utils::path_segment_count;
///
/// assert_eq!(path_segment_count("/home/alice/notes.txt"), 3);
/// assert_eq!(path_segment_count("/home//alice/"), 2);
/// assert_eq!(path_segment_count("C:\\Users\\alice"), 3);
/// ```
pub fn path_segment_count(path: &str) -> usize {
    split_segments(path).count()
}

/// Iterates the non-empty segments of a path string
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|segment| !segment.is_empty())
}

/// Last `count` segments of `path` joined with `/`, lowercased
///
/// Used to compare path-fragment queries such as `src/main` against the tail of a
/// candidate path.
pub fn trailing_segments(path: &str, count: usize) -> String {
    let segments: Vec<&str> = split_segments(path).collect();
    let start = segments.len().saturating_sub(count);
    segments[start..].join("/").to_lowercase()
}

/// True when the text looks like a path fragment rather than a bare name
pub fn has_separator(text: &str) -> bool {
    text.contains(['/', '\\'])
}

/// Normalizes an extension setting: lowercase, without a leading dot
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Converts a path to the UTF-8 key used by the store
///
/// # Errors
///
/// Returns [`LocatorError::Validation`] for paths that are not valid UTF-8.
pub fn path_key(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        LocatorError::Validation(format!("Path is not valid UTF-8: {}", path.display()))
    })
}

/// Makes a path absolute without touching the filesystem
///
/// Relative paths are resolved against the current directory and `.`/`..`
/// components are folded lexically, so paths of deleted files still normalize.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|e| LocatorError::from_io(path, e))?;
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Formats a path with ~ substitution for the home directory
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use findex::format_path_with_tilde;
///
/// let path = PathBuf::from("/Users/alice/Documents");
/// // Returns "~/Documents" if HOME=/Users/alice
/// let formatted = format_path_with_tilde(&path);
/// ```
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

/// Internal helper for path formatting with optional home override (for testing)
pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && !home.is_empty()
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Formats a byte count for display ("0 B", "1.5 KB", "3.2 MB")
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if size < 1024 {
        return format!("{} B", size);
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

//! Keyword extraction for the inverted index

use std::collections::BTreeSet;
use std::path::{Component, Path};

use crate::models::extension_of;

/// Length of the character n-grams taken from file names
pub const NGRAM_LEN: usize = 3;

/// Derives the deterministic keyword set for a path
///
/// - tokens of the file name and of every parent segment, split on `.`, `_`, `-`
///   and whitespace, lowercased, keeping tokens longer than one character
/// - the extension without its dot
/// - every lowercase character 3-gram of the file name
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use findex::indexer::extract_keywords;
///
/// let keywords = extract_keywords(Path::new("/home/me/my_notes.md"));
/// assert!(keywords.contains("notes"));
/// assert!(keywords.contains("md"));
/// assert!(keywords.contains("not"));
/// assert!(!keywords.contains("my_notes.md"));
/// ```
pub fn extract_keywords(path: &Path) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();

    add_tokens(&mut keywords, &name);

    if let Some(parent) = path.parent() {
        for component in parent.components() {
            if let Component::Normal(segment) = component {
                add_tokens(&mut keywords, &segment.to_string_lossy());
            }
        }
    }

    if let Some(extension) = extension_of(path) {
        keywords.insert(extension);
    }

    keywords.extend(ngrams(&name.to_lowercase(), NGRAM_LEN));
    keywords
}

/// Lowercase character n-grams of `text`, in order of appearance (may repeat)
pub fn ngrams(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if n == 0 || chars.len() < n {
        return Vec::new();
    }
    chars.windows(n).map(|window| window.iter().collect::<String>().to_lowercase()).collect()
}

fn add_tokens(keywords: &mut BTreeSet<String>, text: &str) {
    for token in text.split(|c: char| matches!(c, '.' | '_' | '-') || c.is_whitespace()) {
        if token.chars().count() > 1 {
            keywords.insert(token.to_lowercase());
        }
    }
}

//! Multi-factor scoring of candidate records
//!
//! A candidate's score is the sum of
//! - a base score from its [`MatchTier`] against the query,
//! - a frequency/recency bonus from its access statistics,
//! - a file-type bonus for application or source files on matching queries,
//!
//! minus a penalty of 0.5 per path segment, floored at zero. Results are ordered by
//! tier before score, so a better tier always wins regardless of access history.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::similarity::combined_similarity;
use crate::config::SearchConfig;
use crate::models::{FileRecord, MatchTier, SearchResult};
use crate::utils::{has_separator, path_segment_count, split_segments, trailing_segments};

/// Fuzzy similarities are scaled by this before tier selection
const FUZZY_SCALE: f64 = 0.7;

const MAX_FREQUENCY_BONUS: f64 = 10.0;
const FREQUENCY_PER_ACCESS: f64 = 0.1;
const MAX_RECENCY_BONUS: f64 = 10.0;
const RECENCY_DECAY_PER_DAY: f64 = 0.05;

const APP_EXTENSIONS: &[&str] = &["exe", "app", "deb", "dmg", "pkg"];
const APP_BONUS: f64 = 10.0;
const CODE_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "cpp", "c", "h", "go", "rs"];
const CODE_BONUS: f64 = 5.0;
const CODE_QUERY_MARKERS: &[&str] = &["_", "-", "test", "spec"];

const DEPTH_PENALTY_PER_SEGMENT: f64 = 0.5;

/// Base score contributed by each tier
pub fn base_score(tier: MatchTier) -> f64 {
    match tier {
        MatchTier::Exact => 100.0,
        MatchTier::Prefix => 80.0,
        MatchTier::Substring => 60.0,
        MatchTier::FuzzyHigh => 50.0,
        MatchTier::FuzzyMedium => 30.0,
        MatchTier::FuzzyLow => 15.0,
        MatchTier::Recent | MatchTier::Frequent => 0.0,
    }
}

/// Score of the entry at `rank` (0-based) in a recent-files list
pub fn recent_score(rank: usize) -> f64 {
    (100.0 - 5.0 * rank as f64).max(10.0)
}

/// Score of an entry in a frequent-files list
pub fn frequent_score(access_count: u64) -> f64 {
    (access_count as f64 * 10.0).min(100.0)
}

/// Scores records against a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranker {
    pub enable_fuzzy: bool,
    /// Minimum combined similarity, inclusive
    pub fuzzy_threshold: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl Ranker {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self { enable_fuzzy: config.enable_fuzzy, fuzzy_threshold: config.fuzzy_threshold }
    }

    /// Match tier of `target` for `query`, both compared case-insensitively
    ///
    /// `None` when neither a literal match nor a fuzzy match above the threshold exists.
    pub fn classify(&self, query: &str, target: &str) -> Option<MatchTier> {
        let query = query.to_lowercase();
        let target = target.to_lowercase();
        if query.is_empty() || target.is_empty() {
            return None;
        }

        if target == query {
            return Some(MatchTier::Exact);
        }
        if target.starts_with(&query) {
            return Some(MatchTier::Prefix);
        }
        if target.contains(&query) {
            return Some(MatchTier::Substring);
        }

        if !self.enable_fuzzy || query.chars().count() <= 2 {
            return None;
        }

        let similarity = combined_similarity(&query, &target);
        if similarity < self.fuzzy_threshold {
            return None;
        }

        let scaled = similarity * FUZZY_SCALE;
        Some(if scaled >= 0.7 {
            MatchTier::FuzzyHigh
        } else if scaled >= 0.5 {
            MatchTier::FuzzyMedium
        } else {
            MatchTier::FuzzyLow
        })
    }

    /// Tier and final score of `record`, or `None` if it does not match at all
    ///
    /// Queries containing a path separator are compared with the same number of
    /// trailing segments of the record's path instead of its name.
    pub fn score(
        &self,
        query: &str,
        record: &FileRecord,
        now: DateTime<Utc>,
    ) -> Option<(MatchTier, f64)> {
        let path = record.path.to_string_lossy();

        let tier = if has_separator(query) {
            let segments: Vec<&str> = split_segments(query).collect();
            let target = trailing_segments(&path, segments.len());
            self.classify(&segments.join("/"), &target)?
        } else {
            self.classify(query, &record.name)?
        };

        let score = base_score(tier)
            + access_bonus(record, now)
            + type_bonus(query, record.file_type.as_deref())
            - DEPTH_PENALTY_PER_SEGMENT * path_segment_count(&path) as f64;

        Some((tier, score.max(0.0)))
    }
}

/// Frequency plus recency bonus
pub fn access_bonus(record: &FileRecord, now: DateTime<Utc>) -> f64 {
    let frequency = (record.access_count as f64 * FREQUENCY_PER_ACCESS).min(MAX_FREQUENCY_BONUS);

    let recency = match record.last_accessed {
        Some(last) => {
            let days = now.signed_duration_since(last).num_seconds().max(0) as f64 / 86_400.0;
            (MAX_RECENCY_BONUS - days * RECENCY_DECAY_PER_DAY).max(0.0)
        }
        None => 0.0,
    };

    frequency + recency
}

/// Bonus for application files on longer queries and source files on code-like queries
pub fn type_bonus(query: &str, file_type: Option<&str>) -> f64 {
    let Some(file_type) = file_type else {
        return 0.0;
    };
    let file_type = file_type.to_lowercase();

    if APP_EXTENSIONS.contains(&file_type.as_str()) && query.chars().count() > 3 {
        return APP_BONUS;
    }

    let query = query.to_lowercase();
    if CODE_EXTENSIONS.contains(&file_type.as_str())
        && CODE_QUERY_MARKERS.iter().any(|marker| query.contains(marker))
    {
        return CODE_BONUS;
    }

    0.0
}

/// Best first: tier, then score, then shorter name, then path
pub fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.match_tier
        .cmp(&b.match_tier)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path, false)
    }

    fn result(path: &str, score: f64, tier: MatchTier) -> SearchResult {
        SearchResult::from_record(record(path), score, tier)
    }

    #[test]
    fn test_classify_literal_tiers() {
        let ranker = Ranker::default();
        assert_eq!(ranker.classify("readme.md", "README.md"), Some(MatchTier::Exact));
        assert_eq!(ranker.classify("read", "README.md"), Some(MatchTier::Prefix));
        assert_eq!(ranker.classify("me.m", "README.md"), Some(MatchTier::Substring));
        assert_eq!(ranker.classify("readme", "config.json"), None);
    }

    #[test]
    fn test_short_queries_never_fuzzy() {
        let ranker = Ranker::default();
        assert_eq!(ranker.classify("xq", "xr"), None);
    }

    #[test]
    fn test_fuzzy_disabled() {
        let ranker = Ranker { enable_fuzzy: false, fuzzy_threshold: 0.6 };
        assert_eq!(ranker.classify("rpeort", "report"), None);
        assert_eq!(ranker.classify("rep", "report"), Some(MatchTier::Prefix));
    }

    #[test]
    fn test_fuzzy_threshold_is_inclusive() {
        let query = "raport";
        let target = "report.txt";
        let similarity = combined_similarity(query, target);

        let at = Ranker { enable_fuzzy: true, fuzzy_threshold: similarity };
        assert!(at.classify(query, target).is_some_and(|tier| tier.is_fuzzy()));

        let above = Ranker { enable_fuzzy: true, fuzzy_threshold: similarity + 1e-9 };
        assert_eq!(above.classify(query, target), None);
    }

    #[test]
    fn test_fuzzy_tiers_from_scaled_similarity() {
        let ranker = Ranker { enable_fuzzy: true, fuzzy_threshold: 0.0 };
        // identical token sets score 1.0, scaled to 0.7
        assert_eq!(ranker.classify("report annual", "annual.report"), Some(MatchTier::FuzzyHigh));
        // jaro-winkler of martha/marhta is ~0.961, scaled ~0.673
        assert_eq!(ranker.classify("martha", "marhta"), Some(MatchTier::FuzzyMedium));
        assert_eq!(ranker.classify("abc", "xyz"), Some(MatchTier::FuzzyLow));
    }

    #[test]
    fn test_score_components() {
        let ranker = Ranker::default();
        let now = Utc::now();

        // exact (100) - 2 segments * 0.5
        let (tier, score) = ranker.score("notes.txt", &record("/docs/notes.txt"), now).unwrap();
        assert_eq!(tier, MatchTier::Exact);
        assert!((score - 99.0).abs() < 1e-9);

        let mut used = record("/docs/notes.txt");
        used.access_count = 30;
        used.last_accessed = Some(now - Duration::days(20));
        let (_, score) = ranker.score("notes.txt", &used, now).unwrap();
        // + min(3.0, 10) + (10 - 20 * 0.05)
        assert!((score - 111.0).abs() < 1e-6);
    }

    #[test]
    fn test_access_bonus_caps() {
        let now = Utc::now();
        let mut heavy = record("/a");
        heavy.access_count = 1_000;
        heavy.last_accessed = Some(now - Duration::days(400));
        assert!((access_bonus(&heavy, now) - 10.0).abs() < 1e-9);

        assert_eq!(access_bonus(&record("/a"), now), 0.0);
    }

    #[test]
    fn test_type_bonus() {
        assert_eq!(type_bonus("steam", Some("exe")), 10.0);
        assert_eq!(type_bonus("ste", Some("exe")), 0.0);
        assert_eq!(type_bonus("main_window", Some("rs")), 5.0);
        assert_eq!(type_bonus("test", Some("py")), 5.0);
        assert_eq!(type_bonus("main", Some("rs")), 0.0);
        assert_eq!(type_bonus("main_window", None), 0.0);
    }

    #[test]
    fn test_score_floor_at_zero() {
        let ranker = Ranker::default();
        let deep = format!("/{}/report.pdf", vec!["d"; 200].join("/"));
        let (_, score) = ranker.score("report.pdf", &record(&deep), Utc::now()).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_path_fragment_query_compares_trailing_segments() {
        let ranker = Ranker::default();
        let now = Utc::now();
        let matched = ranker.score("src/main.rs", &record("/proj/src/main.rs"), now);
        assert_eq!(matched.map(|(tier, _)| tier), Some(MatchTier::Exact));

        let prefix = ranker.score("SRC/ma", &record("/proj/src/main.rs"), now);
        assert_eq!(prefix.map(|(tier, _)| tier), Some(MatchTier::Prefix));
    }

    #[test]
    fn test_tier_beats_score() {
        let mut results = vec![
            result("/a/report-final.pdf", 500.0, MatchTier::Substring),
            result("/a/report.pdf", 1.0, MatchTier::Exact),
            result("/a/reprt.pdf", 900.0, MatchTier::FuzzyHigh),
        ];
        results.sort_by(compare_results);
        let tiers: Vec<MatchTier> = results.iter().map(|r| r.match_tier).collect();
        assert_eq!(tiers, vec![MatchTier::Exact, MatchTier::Substring, MatchTier::FuzzyHigh]);
    }

    #[test]
    fn test_ties_prefer_shorter_name_then_path() {
        let mut results = vec![
            result("/b/readme_old.txt", 70.0, MatchTier::Prefix),
            result("/b/readme.md", 70.0, MatchTier::Prefix),
            result("/a/readme.md", 70.0, MatchTier::Prefix),
        ];
        results.sort_by(compare_results);
        let paths: Vec<String> = results.iter().map(|r| r.path.display().to_string()).collect();
        assert_eq!(paths, vec!["/a/readme.md", "/b/readme.md", "/b/readme_old.txt"]);
    }

    #[test]
    fn test_recent_and_frequent_scores() {
        assert_eq!(recent_score(0), 100.0);
        assert_eq!(recent_score(3), 85.0);
        assert_eq!(recent_score(50), 10.0);
        assert_eq!(frequent_score(4), 40.0);
        assert_eq!(frequent_score(25), 100.0);
    }
}

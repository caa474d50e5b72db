use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::ranking::{Ranker, compare_results, frequent_score, recent_score};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::filters::{SearchFilters, apply_filters};
use crate::index_storage::Store;
use crate::indexer::{keywords::NGRAM_LEN, ngrams};
use crate::models::{FileRecord, MatchTier, SearchResult};
use crate::utils::{has_separator, split_segments};

/// Cache effectiveness counters since the searcher was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Candidate retrieval, ranking and result caching over a [`Store`]
pub struct Searcher {
    store: Arc<Store>,
    config: SearchConfig,
    ranker: Ranker,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Searcher {
    pub fn new(store: Arc<Store>, config: SearchConfig) -> Self {
        let ranker = Ranker::from_config(&config);
        Self {
            store,
            config,
            ranker,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ranked matches for `query`, at most `max_results` of them
    ///
    /// An empty or whitespace-only query returns no results without touching the store.
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Result<Vec<SearchResult>> {
        self.search_at(query, filters, self.config.max_results, Utc::now())
    }

    /// Like [`search`](Self::search) with an explicit result limit
    pub fn search_limited(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.search_at(query, filters, limit, Utc::now())
    }

    pub(crate) fn search_at(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let signature = self.signature(query, filters, limit);
        if self.config.cache_results {
            if let Some(cached) = self.store.cached_results(&signature)? {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {:?} ({} results)", query, cached.len());
                return Ok(cached);
            }
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let candidates = self.candidates(query, limit.saturating_mul(2))?;
        let candidate_count = candidates.len();
        let candidates = apply_filters(candidates, filters);

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|record| {
                let (tier, score) = self.ranker.score(query, &record, now)?;
                Some(SearchResult::from_record(record, score, tier))
            })
            .collect();
        results.sort_by(compare_results);
        results.truncate(limit);

        debug!("Query {:?}: {} candidates, {} results", query, candidate_count, results.len());

        if self.config.cache_results {
            self.store.store_cached_results(&signature, &results)?;
        }
        Ok(results)
    }

    /// Most recently accessed records, scored by rank
    pub fn recent_files(&self, limit: usize) -> Result<Vec<SearchResult>> {
        let records = self.store.recent_records(limit)?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(rank, record)| {
                SearchResult::from_record(record, recent_score(rank), MatchTier::Recent)
            })
            .collect())
    }

    /// Most frequently accessed records, scored by access count
    pub fn frequent_files(&self, limit: usize) -> Result<Vec<SearchResult>> {
        let records = self.store.frequent_records(limit)?;
        Ok(records
            .into_iter()
            .map(|record| {
                let score = frequent_score(record.access_count);
                SearchResult::from_record(record, score, MatchTier::Frequent)
            })
            .collect())
    }

    /// Records that `path` was opened; returns whether it is indexed
    pub fn record_access(&self, path: &Path) -> Result<bool> {
        self.store.record_access(path)
    }

    pub fn clear_cache(&self) -> Result<usize> {
        self.store.clear_cache()
    }

    /// Drops cache entries older than the configured maximum age
    pub fn cleanup_cache(&self) -> Result<usize> {
        self.store.cleanup_cache(self.config.cache_max_age_days)
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Cache key covering everything that influences the ranked list
    fn signature(&self, query: &str, filters: &SearchFilters, limit: usize) -> String {
        format!(
            "{}|{}|limit={}|fuzzy={}:{}",
            query.to_lowercase(),
            filters,
            limit,
            self.ranker.enable_fuzzy,
            self.ranker.fuzzy_threshold
        )
    }

    /// Merged candidates from every lookup, deduplicated by path, first occurrence wins
    fn candidates(&self, query: &str, cap: usize) -> Result<Vec<FileRecord>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut candidates = Vec::new();
        let mut merge = |records: Vec<FileRecord>| {
            for record in records {
                if seen.insert(record.path.clone()) {
                    candidates.push(record);
                }
            }
        };

        let fragment = has_separator(query);
        let name_part =
            if fragment { split_segments(query).last().unwrap_or(query) } else { query };

        merge(self.store.query_by_name(name_part, cap)?);
        merge(self.store.query_by_name_contains(name_part, cap)?);
        merge(self.store.query_by_keyword_substring(name_part, cap)?);

        if self.ranker.enable_fuzzy && name_part.chars().count() > 2 {
            let mut grams = ngrams(&name_part.to_lowercase(), NGRAM_LEN);
            grams.sort();
            grams.dedup();
            merge(self.store.query_by_keywords(&grams, cap)?);
        }

        if fragment {
            let normalized = split_segments(query).collect::<Vec<_>>().join("/");
            merge(self.store.query_by_path_contains(&normalized, cap)?);
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::indexer::extract_keywords;

    fn searcher_with(paths: &[&str]) -> Searcher {
        let store = Arc::new(Store::open_in_memory().unwrap());
        for path in paths {
            let is_dir = !path.contains('.');
            let record = FileRecord::new(*path, is_dir);
            store.upsert_record(&record, &extract_keywords(Path::new(path))).unwrap();
        }
        Searcher::new(store, SearchConfig::default())
    }

    fn names(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let searcher = searcher_with(&["/docs/readme.md"]);
        assert!(searcher.search("   ", &SearchFilters::new()).unwrap().is_empty());
        assert_eq!(searcher.stats(), SearchStats::default());
    }

    #[test]
    fn test_readme_scenario() {
        let searcher =
            searcher_with(&["/docs/readme.md", "/docs/README_OLD.txt", "/docs/config.json"]);

        let results = searcher.search("readme", &SearchFilters::new()).unwrap();
        assert_eq!(names(&results), vec!["readme.md", "README_OLD.txt"]);

        let partial = searcher.search("readm", &SearchFilters::new()).unwrap();
        assert_eq!(partial.len(), 2);

        let exact = searcher.search("readme.md", &SearchFilters::new()).unwrap();
        assert_eq!(exact[0].match_tier, MatchTier::Exact);
        assert!(partial.iter().all(|r| r.score < exact[0].score));
    }

    #[test]
    fn test_exact_beats_frequently_used_prefix() {
        let searcher = searcher_with(&["/a/report.pdf", "/a/report.pdf.bak"]);
        for _ in 0..100 {
            searcher.record_access(Path::new("/a/report.pdf.bak")).unwrap();
        }

        let results = searcher.search("report.pdf", &SearchFilters::new()).unwrap();
        assert_eq!(names(&results), vec!["report.pdf", "report.pdf.bak"]);
        assert_eq!(results[0].match_tier, MatchTier::Exact);
        assert_eq!(results[1].match_tier, MatchTier::Prefix);
    }

    #[test]
    fn test_typo_reaches_fuzzy_scorer() {
        let searcher = searcher_with(&["/docs/readme.md", "/docs/config.json"]);
        let results = searcher.search("raedme", &SearchFilters::new()).unwrap();
        assert_eq!(names(&results), vec!["readme.md"]);
        assert!(results[0].match_tier.is_fuzzy());
    }

    #[test]
    fn test_second_search_served_from_cache() {
        let searcher = searcher_with(&["/docs/readme.md"]);
        let first = searcher.search("readme", &SearchFilters::new()).unwrap();
        let second = searcher.search("readme", &SearchFilters::new()).unwrap();

        assert_eq!(first, second);
        assert_eq!(searcher.stats(), SearchStats { cache_hits: 1, cache_misses: 1 });
    }

    #[test]
    fn test_access_invalidates_cached_list() {
        let searcher = searcher_with(&["/docs/readme.md"]);
        searcher.search("readme", &SearchFilters::new()).unwrap();
        searcher.record_access(Path::new("/docs/readme.md")).unwrap();

        let results = searcher.search("readme", &SearchFilters::new()).unwrap();
        assert_eq!(results[0].access_count, 1);
        assert_eq!(searcher.stats().cache_misses, 2);
    }

    #[test]
    fn test_filters_are_part_of_signature() {
        let searcher = searcher_with(&["/p/main.rs", "/p/main.py"]);
        let rust = searcher.search("main", &SearchFilters::new().with_type("rs")).unwrap();
        let python = searcher.search("main", &SearchFilters::new().with_type("py")).unwrap();
        assert_eq!(names(&rust), vec!["main.rs"]);
        assert_eq!(names(&python), vec!["main.py"]);
    }

    #[test]
    fn test_directories_only() {
        let searcher = searcher_with(&["/p/src", "/p/src.rs"]);
        let results = searcher.search("src", &SearchFilters::directories_only()).unwrap();
        assert_eq!(names(&results), vec!["src"]);
        assert!(results[0].is_directory);
    }

    #[test]
    fn test_path_fragment_query() {
        let searcher = searcher_with(&["/proj/src/main.rs", "/proj/tests/main.rs"]);
        let results = searcher.search("src/main.rs", &SearchFilters::new()).unwrap();
        assert_eq!(results[0].path, PathBuf::from("/proj/src/main.rs"));
        assert_eq!(results[0].match_tier, MatchTier::Exact);
    }

    #[test]
    fn test_limit_truncates() {
        let paths: Vec<String> = (0..20).map(|i| format!("/d/note_{}.txt", i)).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let searcher = searcher_with(&refs);

        let results = searcher.search_limited("note", &SearchFilters::new(), 5).unwrap();
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_recency_breaks_ties_within_tier() {
        let searcher = searcher_with(&["/a/notes.txt", "/b/notes.txt"]);
        let now = Utc::now();
        let last_hour = now - Duration::hours(1);
        searcher.store.record_access_at(Path::new("/b/notes.txt"), last_hour).unwrap();

        let results = searcher.search_at("notes.txt", &SearchFilters::new(), 10, now).unwrap();
        assert_eq!(results[0].path, PathBuf::from("/b/notes.txt"));
    }

    #[test]
    fn test_recent_and_frequent_files() {
        let searcher = searcher_with(&["/a/one.txt", "/a/two.txt", "/a/three.txt"]);
        let now = Utc::now();
        let store = &searcher.store;
        store.record_access_at(Path::new("/a/one.txt"), now - Duration::days(2)).unwrap();
        store.record_access_at(Path::new("/a/one.txt"), now - Duration::days(1)).unwrap();
        store.record_access_at(Path::new("/a/two.txt"), now).unwrap();

        let recent = searcher.recent_files(10).unwrap();
        assert_eq!(names(&recent), vec!["two.txt", "one.txt"]);
        assert_eq!(recent[0].score, 100.0);
        assert_eq!(recent[1].score, 95.0);
        assert!(recent.iter().all(|r| r.match_tier == MatchTier::Recent));

        let frequent = searcher.frequent_files(10).unwrap();
        assert_eq!(names(&frequent), vec!["one.txt", "two.txt"]);
        assert_eq!(frequent[0].score, 20.0);
        assert_eq!(frequent[0].match_tier, MatchTier::Frequent);
    }

    #[test]
    fn test_cache_disabled_never_counts() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = SearchConfig { cache_results: false, ..SearchConfig::default() };
        let searcher = Searcher::new(Arc::clone(&store), config);
        searcher.search("anything", &SearchFilters::new()).unwrap();

        assert_eq!(searcher.stats(), SearchStats::default());
        assert_eq!(store.stats().unwrap().cache_entries, 0);
    }
}

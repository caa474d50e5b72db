//! Top-level facade tying the store, indexer, searcher and watcher together
//!
//! A [`FileLocator`] is built once from a [`Config`] and passed around by reference.
//! Dropping it (or calling [`FileLocator::shutdown`]) stops monitoring before the
//! store is released.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::filters::SearchFilters;
use crate::index_storage::Store;
use crate::indexer::{ExclusionPolicy, IndexOutcome, IndexSummary, Indexer, Progress};
use crate::models::SearchResult;
use crate::search::Searcher;
use crate::utils::absolute_path;
use crate::watcher::Monitor;

/// Snapshot returned by [`FileLocator::stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatorStats {
    pub total_files: u64,
    pub total_directories: u64,
    pub total_keywords: u64,
    pub cached_searches: u64,
    pub is_monitoring: bool,
    pub monitored_paths: Vec<PathBuf>,
    pub excluded_extensions: Vec<String>,
    pub excluded_paths: Vec<String>,
    pub index_hidden: bool,
    pub index_directories: bool,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub events_processed: u64,
    pub event_failures: u64,
}

pub struct FileLocator {
    config: Config,
    store: Arc<Store>,
    indexer: Arc<Indexer>,
    searcher: Searcher,
    monitor: Monitor,
}

impl FileLocator {
    /// Opens the database named by `config` and wires up every component
    ///
    /// Cache entries older than `search.cache_max_age_days` are purged on open.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let path = config.database_path()?;
        let store = Store::open(&path)?;
        let locator = Self::with_store(config, store);

        if locator.config.search.cache_results {
            let purged = locator.searcher.cleanup_cache()?;
            if purged > 0 {
                debug!("Purged {} stale cache entries on open", purged);
            }
        }
        Ok(locator)
    }

    /// A locator over a private in-memory database
    pub fn open_in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_store(config, Store::open_in_memory()?))
    }

    fn with_store(config: Config, store: Store) -> Self {
        let store = Arc::new(store);
        let policy = ExclusionPolicy::from_config(&config.indexing);
        let indexer = Arc::new(Indexer::new(Arc::clone(&store), policy));
        let searcher = Searcher::new(Arc::clone(&store), config.search.clone());
        let monitor = Monitor::new(Arc::clone(&indexer));
        Self { config, store, indexer, searcher, monitor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Indexes the entries below `path`; see [`Indexer::index_directory`]
    pub fn index_directory(
        &self,
        path: &Path,
        recursive: bool,
        progress: Option<&mut dyn FnMut(&Progress)>,
    ) -> Result<IndexSummary> {
        with_progress(progress, |progress| self.indexer.index_directory(path, recursive, progress))
    }

    /// Indexes a single file or directory entry
    pub fn index_path(&self, path: &Path) -> Result<IndexOutcome> {
        self.indexer.index_path(path)
    }

    /// Clears the index and walks every path in `paths` recursively
    pub fn rebuild_index(
        &self,
        paths: &[PathBuf],
        progress: Option<&mut dyn FnMut(&Progress)>,
    ) -> Result<IndexSummary> {
        with_progress(progress, |progress| self.indexer.rebuild(paths, progress))
    }

    /// Indexes the configured `auto_index_paths` that exist, skipping the rest
    pub fn auto_index(&self, progress: Option<&mut dyn FnMut(&Progress)>) -> Result<IndexSummary> {
        let roots: Vec<&PathBuf> = self
            .config
            .indexing
            .auto_index_paths
            .iter()
            .filter(|path| {
                let exists = path.is_dir();
                if !exists {
                    warn!("Skipping missing auto-index path {}", path.display());
                }
                exists
            })
            .collect();

        with_progress(progress, |progress| {
            let mut total = IndexSummary::default();
            for root in roots {
                let summary = self.indexer.index_directory(root, true, progress)?;
                total.indexed += summary.indexed;
                total.skipped += summary.skipped;
                if summary.cancelled {
                    total.cancelled = true;
                    break;
                }
            }
            Ok(total)
        })
    }

    /// Starts the watcher on `paths`, or on `indexing.watch_paths` when `paths` is empty
    pub fn start_monitoring(&self, paths: &[PathBuf]) -> Result<()> {
        let paths = if paths.is_empty() { &self.config.indexing.watch_paths[..] } else { paths };
        self.monitor.start(paths)
    }

    pub fn stop_monitoring(&self) {
        self.monitor.stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    /// Ranked matches for `query`, at most `search.max_results` of them
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Result<Vec<SearchResult>> {
        self.searcher.search(query, filters)
    }

    pub fn search_limited(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.searcher.search_limited(query, filters, limit)
    }

    pub fn recent_files(&self, limit: usize) -> Result<Vec<SearchResult>> {
        self.searcher.recent_files(limit)
    }

    pub fn frequent_files(&self, limit: usize) -> Result<Vec<SearchResult>> {
        self.searcher.frequent_files(limit)
    }

    /// Records that `path` was opened; returns `false` when it is not indexed
    pub fn record_access(&self, path: &Path) -> Result<bool> {
        self.searcher.record_access(&absolute_path(path)?)
    }

    pub fn clear_cache(&self) -> Result<usize> {
        self.searcher.clear_cache()
    }

    pub fn cleanup_cache(&self) -> Result<usize> {
        self.searcher.cleanup_cache()
    }

    /// Removes the record for `path`; returns `false` when it was not indexed
    pub fn remove_record(&self, path: &Path) -> Result<bool> {
        self.store.remove_record(&absolute_path(path)?)
    }

    /// Deletes every record, keyword and cache entry
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear_all()?;
        info!("Index cleared");
        Ok(())
    }

    /// Flag that cancels a running foreground walk when set
    ///
    /// Subtrees indexed by the watcher are not affected.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.indexer.cancel_handle()
    }

    pub fn stats(&self) -> Result<LocatorStats> {
        let store = self.store.stats()?;
        let search = self.searcher.stats();
        let monitor = self.monitor.stats();
        let policy = self.indexer.policy();

        Ok(LocatorStats {
            total_files: store.files,
            total_directories: store.directories,
            total_keywords: store.keywords,
            cached_searches: store.cache_entries,
            is_monitoring: self.monitor.is_running(),
            monitored_paths: self.monitor.roots(),
            excluded_extensions: policy.excluded_extensions(),
            excluded_paths: policy.excluded_paths(),
            index_hidden: self.config.indexing.index_hidden,
            index_directories: policy.index_directories(),
            cache_hits: search.cache_hits,
            cache_misses: search.cache_misses,
            events_processed: monitor.events_processed,
            event_failures: monitor.event_failures,
        })
    }

    /// Stops monitoring; the store closes once the locator is dropped
    pub fn shutdown(&self) {
        self.monitor.stop();
        debug!("Locator shut down");
    }
}

impl Drop for FileLocator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn with_progress<T>(
    progress: Option<&mut dyn FnMut(&Progress)>,
    run: impl FnOnce(&mut dyn FnMut(&Progress)) -> Result<T>,
) -> Result<T> {
    match progress {
        Some(progress) => run(progress),
        None => run(&mut |_: &Progress| {}),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::error::LocatorError;

    fn locator() -> FileLocator {
        FileLocator::open_in_memory(Config::default()).unwrap()
    }

    #[test]
    fn test_index_search_remove() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.md"), "x").unwrap();
        fs::write(dir.path().join("todo.txt"), "x").unwrap();
        let locator = locator();

        let summary = locator.index_directory(dir.path(), true, None).unwrap();
        assert_eq!(summary.indexed, 2);
        assert_eq!(locator.stats().unwrap().total_files, 2);

        let results = locator.search("notes.md", &SearchFilters::new()).unwrap();
        assert_eq!(results[0].name, "notes.md");

        assert!(locator.remove_record(&dir.path().join("notes.md")).unwrap());
        assert_eq!(locator.stats().unwrap().total_files, 1);
        let results = locator.search("notes.md", &SearchFilters::new()).unwrap();
        assert!(results.iter().all(|r| r.name != "notes.md"));
    }

    #[test]
    fn test_progress_callback_receives_final_call() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let locator = locator();

        let mut calls = Vec::new();
        let mut record = |p: &Progress| calls.push(p.clone());
        locator.index_directory(dir.path(), false, Some(&mut record)).unwrap();

        let last = calls.last().unwrap();
        assert!(last.finished);
        assert_eq!(last.count, 1);
    }

    #[test]
    fn test_stats_reports_policy() {
        let stats = locator().stats().unwrap();
        assert!(!stats.index_hidden);
        assert!(stats.index_directories);
        assert!(stats.excluded_extensions.contains(&"log".to_string()));
        assert!(stats.excluded_paths.contains(&"node_modules".to_string()));
        assert!(!stats.is_monitoring);
    }

    #[test]
    fn test_monitoring_defaults_to_configured_paths() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.indexing.watch_paths = vec![dir.path().to_path_buf()];
        let locator = FileLocator::open_in_memory(config).unwrap();

        locator.start_monitoring(&[]).unwrap();
        assert!(locator.is_monitoring());
        assert_eq!(locator.stats().unwrap().monitored_paths, vec![dir.path().to_path_buf()]);

        locator.shutdown();
        assert!(!locator.is_monitoring());
    }

    #[test]
    fn test_monitoring_without_paths_is_rejected() {
        let err = locator().start_monitoring(&[]).unwrap_err();
        assert!(matches!(err, LocatorError::Validation(_)));
    }

    #[test]
    fn test_auto_index_skips_missing_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("auto.txt"), "x").unwrap();
        let mut config = Config::default();
        config.indexing.auto_index_paths =
            vec![dir.path().to_path_buf(), dir.path().join("missing")];
        let locator = FileLocator::open_in_memory(config).unwrap();

        let summary = locator.auto_index(None).unwrap();
        assert_eq!(summary.indexed, 1);
    }

    #[test]
    fn test_open_persists_to_configured_database() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("kept.txt"), "x").unwrap();

        let mut config = Config::default();
        config.storage.database_path = Some(dir.path().join("db").join("index.db"));

        {
            let locator = FileLocator::open(config.clone()).unwrap();
            locator.index_directory(&data, true, None).unwrap();
        }
        let reopened = FileLocator::open(config).unwrap();
        assert_eq!(reopened.stats().unwrap().total_files, 1);
    }
}

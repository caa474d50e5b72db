//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use findex::{Config, FileLocator};
use tempfile::TempDir;

/// Builder for directory trees to index
pub struct TreeBuilder {
    temp_dir: TempDir,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a file (parent directories are created) with the given content
    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write file");
        self
    }

    /// Add several empty files
    pub fn files(self, relatives: &[&str]) -> Self {
        relatives.iter().fold(self, |builder, relative| builder.file(relative, ""))
    }

    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.temp_dir.path().join(relative)).expect("Failed to create dir");
        self
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

/// Locator over a fresh in-memory database with default settings
pub fn memory_locator() -> FileLocator {
    memory_locator_with(Config::default())
}

pub fn memory_locator_with(config: Config) -> FileLocator {
    FileLocator::open_in_memory(config).expect("Failed to open locator")
}

/// Locator that has already indexed `root` recursively
pub fn indexed_locator(root: &Path) -> FileLocator {
    let locator = memory_locator();
    locator.index_directory(root, true, None).expect("Failed to index");
    locator
}

pub fn result_names(results: &[findex::SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.name.clone()).collect()
}

pub fn result_paths(results: &[findex::SearchResult]) -> Vec<PathBuf> {
    results.iter().map(|r| r.path.clone()).collect()
}

/// Polls `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

/// Typical project tree used by several tests
pub fn sample_project() -> TempDir {
    TreeBuilder::new()
        .file("readme.md", "# Project")
        .file("README_OLD.txt", "old readme")
        .file("config.json", "{}")
        .file("src/main.rs", "fn main() {}")
        .file("src/lib.rs", "")
        .file("src/search_engine.py", "")
        .file("tests/test_parser.py", "")
        .file("node_modules/left-pad/index.js", "")
        .file(".env", "SECRET=1")
        .file("build.log", "")
        .build()
}

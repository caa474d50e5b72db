//! findex - Index local files and find them by name
//!
//! This library maintains a SQLite-backed index of file and directory metadata and
//! answers name queries against it. It supports:
//!
//! - Recursive directory indexing with hidden-file, path-segment and extension exclusions
//! - An inverted keyword index built from name tokens, parent segments and 3-grams
//! - Ranked search (exact, prefix, substring and fuzzy tiers) with usage bonuses
//! - Inline query filters (`type:rs kind:file path:src since:2024-01-01`)
//! - A result cache invalidated by every write
//! - Live updates from filesystem notifications
//!
//! # Example
//!
//! ```no_run
//! use findex::{Config, FileLocator, SearchFilters};
//! use std::path::Path;
//!
//! let locator = FileLocator::open(Config::default())?;
//! locator.index_directory(Path::new("/home/alice/projects"), true, None)?;
//! for result in locator.search("readme", &SearchFilters::new())? {
//!     println!("{:.1} {}", result.score, result.path.display());
//! }
//! # Ok::<(), findex::LocatorError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod index_storage;
pub mod indexer;
pub mod locator;
pub mod models;
pub mod search;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use error::{LocatorError, Result};
pub use filters::{SearchFilters, parse_query};
pub use indexer::{IndexOutcome, IndexSummary, Progress};
pub use locator::{FileLocator, LocatorStats};
pub use models::{FileRecord, MatchTier, SearchResult};
pub use utils::paths::format_path_with_tilde;

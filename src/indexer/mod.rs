//! Filesystem indexing: exclusion rules, keyword extraction and directory walks
//!
//! # Error Handling Strategy
//!
//! - **Single paths** ([`Indexer::index_path`]): every failure propagates, including
//!   `NotFound` for paths that vanished and `Validation` for non-UTF-8 names.
//! - **Walks** ([`Indexer::index_directory`]): per-entry failures are logged and counted
//!   as skipped; only storage failures abort the walk.
//! - **Rebuilds** ([`Indexer::rebuild`]): roots are validated before the store is cleared.

pub mod builder;
pub mod exclusion;
pub mod keywords;

pub use builder::{IndexOutcome, IndexSummary, Indexer, PROGRESS_INTERVAL, Progress};
pub use exclusion::{ExclusionPolicy, ExclusionReason};
pub use keywords::{extract_keywords, ngrams};

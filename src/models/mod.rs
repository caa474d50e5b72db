//! Data models for the file index.
//!
//! - [`FileRecord`] - metadata row for one file or directory, keyed by absolute path
//! - [`RecordId`] - stable identifier of a stored record
//! - [`SearchResult`] - ranked hit returned by the searcher and stored in the query cache
//! - [`MatchTier`] - discrete match category used to order results before score
//!
//! Keyword entries and cache entries have no standalone model: they are owned by
//! the store and only surface as keyword sets and serialized result lists.

pub mod record;
pub mod search;

pub use record::{FileRecord, RecordId, display_name, extension_of};
pub use search::{MatchTier, SearchResult};

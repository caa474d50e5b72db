//! Query execution: candidate lookup, fuzzy similarity and ranking
//!
//! A search gathers candidates from several store lookups (exact name, partial name,
//! keyword substring, shared 3-grams and, for path fragments, path substring), applies
//! [`SearchFilters`](crate::filters::SearchFilters), then ranks what is left with
//! [`Ranker`]. Final lists are cached in the store under a signature of the query,
//! filters and limit.

pub mod engine;
pub mod ranking;
pub mod similarity;

pub use engine::{SearchStats, Searcher};
pub use ranking::{Ranker, base_score, compare_results};
pub use similarity::{combined_similarity, jaro_winkler, levenshtein_similarity, token_jaccard};

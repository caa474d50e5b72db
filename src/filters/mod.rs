pub mod apply;
pub mod ast;
pub mod parser;

pub use apply::{apply_filters, matches_filters};
pub use ast::{EntryKind, FilterField, ParsedQuery, SearchFilters};
pub use parser::parse_query;

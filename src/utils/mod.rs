pub mod environment;
pub mod paths;
pub mod timestamps;

pub use environment::{HOME_ENV, default_config_path, default_database_path, get_findex_home};
pub use paths::{
    absolute_path, format_file_size, format_path_with_tilde, has_separator, normalize_extension,
    path_key, path_segment_count, split_segments, trailing_segments,
};
pub use timestamps::format_timestamp;

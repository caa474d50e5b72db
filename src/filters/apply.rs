use chrono::NaiveTime;

use super::ast::{EntryKind, SearchFilters};
use crate::models::FileRecord;

/// Keeps the records accepted by `filters`
///
/// Filter logic:
/// - Same-field OR: type:rs type:md → (rs OR md)
/// - Cross-field AND: type:rs kind:file → (rs AND file)
pub fn apply_filters(records: Vec<FileRecord>, filters: &SearchFilters) -> Vec<FileRecord> {
    if filters.is_empty() {
        return records;
    }
    records.into_iter().filter(|record| matches_filters(record, filters)).collect()
}

/// Evaluate all filters against one record
pub fn matches_filters(record: &FileRecord, filters: &SearchFilters) -> bool {
    match_kind(record, filters.kind)
        && match_type(record, filters)
        && match_path(record, &filters.path_contains)
        && match_since(record, filters)
}

fn match_kind(record: &FileRecord, kind: EntryKind) -> bool {
    match kind {
        EntryKind::Any => true,
        EntryKind::FilesOnly => !record.is_directory,
        EntryKind::DirectoriesOnly => record.is_directory,
    }
}

/// Records without a type never pass a type filter
fn match_type(record: &FileRecord, filters: &SearchFilters) -> bool {
    if filters.file_types.is_empty() {
        return true;
    }
    record
        .file_type
        .as_ref()
        .is_some_and(|file_type| filters.file_types.contains(&file_type.to_lowercase()))
}

/// Match path (case-insensitive substring match, any of the values)
fn match_path(record: &FileRecord, values: &[String]) -> bool {
    if values.is_empty() {
        return true;
    }
    let lower_path = record.path.to_string_lossy().to_lowercase();

    values.iter().any(|value| {
        let lower_value = value.to_lowercase();

        // Support ~ expansion
        let search_value = if lower_value.starts_with('~') {
            match dirs::home_dir() {
                Some(home) => {
                    let home_str = home.to_string_lossy().to_lowercase();
                    lower_value.replacen('~', &home_str, 1)
                }
                None => lower_value,
            }
        } else {
            lower_value
        };

        lower_path.contains(&search_value)
    })
}

/// Match modified time on or after the start of the date (UTC)
fn match_since(record: &FileRecord, filters: &SearchFilters) -> bool {
    let Some(date) = filters.modified_since else {
        return true;
    };
    let start = date.and_time(NaiveTime::MIN).and_utc();
    record.modified_time.is_some_and(|modified| modified >= start)
}

//! Record and inverted-index operations on [`Store`]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, params, params_from_iter};
use tracing::debug;

use super::Store;
use super::cache::invalidate_cache;
use crate::error::Result;
use crate::models::record::{from_millis, to_millis};
use crate::models::{FileRecord, RecordId};
use crate::utils::path_key;

const RECORD_COLUMNS: &str = "f.path, f.name, f.size, f.created_time, f.modified_time, \
     f.file_type, f.is_directory, f.access_count, f.last_accessed, f.indexed_time";

/// Tie-break shared by every lookup: most used, then most recently used
const POPULARITY_ORDER: &str = "f.access_count DESC, f.last_accessed DESC, f.path";

const KEYWORD_WEIGHT: f64 = 1.0;

impl Store {
    /// Inserts or updates the record for `record.path` and replaces its keywords
    ///
    /// The row id of an existing path is kept, as are its access statistics.
    pub fn upsert_record(
        &self,
        record: &FileRecord,
        keywords: &BTreeSet<String>,
    ) -> Result<RecordId> {
        self.with_transaction(|tx| {
            let id = upsert_in(tx, record, keywords)?;
            invalidate_cache(tx)?;
            Ok(id)
        })
    }

    /// Upserts many records in one transaction
    pub fn upsert_batch(&self, items: &[(FileRecord, BTreeSet<String>)]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        self.with_transaction(|tx| {
            for (record, keywords) in items {
                upsert_in(tx, record, keywords)?;
            }
            invalidate_cache(tx)?;
            Ok(items.len())
        })
    }

    pub fn get_record(&self, path: &Path) -> Result<Option<FileRecord>> {
        let key = path_key(path)?;
        self.with_connection(|conn| {
            let sql = format!("SELECT {} FROM files f WHERE f.path = ?1", RECORD_COLUMNS);
            let record = conn.query_row(&sql, params![key], record_from_row).optional()?;
            Ok(record)
        })
    }

    /// Keywords stored for a path, sorted
    pub fn keywords_for(&self, path: &Path) -> Result<Vec<String>> {
        let key = path_key(path)?;
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT k.keyword FROM keywords k JOIN files f ON f.id = k.file_id
                 WHERE f.path = ?1 ORDER BY k.keyword",
            )?;
            let keywords = stmt
                .query_map(params![key], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keywords)
        })
    }

    /// Deletes one record and its keywords; returns whether it existed
    pub fn remove_record(&self, path: &Path) -> Result<bool> {
        let key = path_key(path)?;
        let removed = self.with_transaction(|tx| {
            let removed = tx.execute("DELETE FROM files WHERE path = ?1", params![key])?;
            if removed > 0 {
                invalidate_cache(tx)?;
            }
            Ok(removed > 0)
        })?;
        if removed {
            debug!("Removed {}", path.display());
        }
        Ok(removed)
    }

    /// Deletes a path and every record below it; returns the number of rows removed
    pub fn remove_tree(&self, path: &Path) -> Result<usize> {
        let key = path_key(path)?;
        let prefix = if key.ends_with('/') { key.to_string() } else { format!("{}/", key) };
        let prefix_len = prefix.chars().count() as i64;

        let removed = self.with_transaction(|tx| {
            let removed = tx.execute(
                "DELETE FROM files WHERE path = ?1 OR substr(path, 1, ?3) = ?2",
                params![key, prefix, prefix_len],
            )?;
            if removed > 0 {
                invalidate_cache(tx)?;
            }
            Ok(removed)
        })?;
        if removed > 0 {
            debug!("Removed {} record(s) under {}", removed, path.display());
        }
        Ok(removed)
    }

    /// Bumps the access count and timestamp; a path that is not indexed is a no-op
    pub fn record_access(&self, path: &Path) -> Result<bool> {
        self.record_access_at(path, Utc::now())
    }

    pub fn record_access_at(&self, path: &Path, at: DateTime<Utc>) -> Result<bool> {
        let key = path_key(path)?;
        self.with_transaction(|tx| {
            let updated = tx.execute(
                "UPDATE files SET access_count = access_count + 1, last_accessed = ?2
                 WHERE path = ?1",
                params![key, to_millis(&at)],
            )?;
            if updated > 0 {
                invalidate_cache(tx)?;
            }
            Ok(updated > 0)
        })
    }

    /// Records whose name equals `name`, ignoring case
    pub fn query_by_name(&self, name: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files f WHERE f.name_lower = ?1 ORDER BY {} LIMIT ?2",
            RECORD_COLUMNS, POPULARITY_ORDER
        );
        let name = name.to_lowercase();
        self.with_connection(|conn| query_records(conn, &sql, params![name, limit as i64]))
    }

    /// Records whose name contains `text`, ignoring case
    pub fn query_by_name_contains(&self, text: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files f WHERE f.name_lower LIKE ?1 ESCAPE '\\' ORDER BY {} LIMIT ?2",
            RECORD_COLUMNS, POPULARITY_ORDER
        );
        let pattern = contains_pattern(&text.to_lowercase());
        self.with_connection(|conn| query_records(conn, &sql, params![pattern, limit as i64]))
    }

    /// Records whose full path contains `text`, ignoring ASCII case
    pub fn query_by_path_contains(&self, text: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files f WHERE f.path LIKE ?1 ESCAPE '\\' ORDER BY {} LIMIT ?2",
            RECORD_COLUMNS, POPULARITY_ORDER
        );
        let pattern = contains_pattern(text);
        self.with_connection(|conn| query_records(conn, &sql, params![pattern, limit as i64]))
    }

    /// Records having at least one keyword containing `text`, most keyword hits first
    pub fn query_by_keyword_substring(&self, text: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {}, COUNT(k.keyword) AS hits
             FROM files f JOIN keywords k ON k.file_id = f.id
             WHERE k.keyword LIKE ?1 ESCAPE '\\'
             GROUP BY f.id ORDER BY hits DESC, {} LIMIT ?2",
            RECORD_COLUMNS, POPULARITY_ORDER
        );
        let pattern = contains_pattern(&text.to_lowercase());
        self.with_connection(|conn| query_records(conn, &sql, params![pattern, limit as i64]))
    }

    /// Records holding any of the exact `keywords`, most distinct hits first
    pub fn query_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<FileRecord>> {
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let placeholders = (1..=keywords.len()).map(|i| format!("?{}", i)).collect::<Vec<_>>();
        let sql = format!(
            "SELECT {}, COUNT(k.keyword) AS hits
             FROM files f JOIN keywords k ON k.file_id = f.id
             WHERE k.keyword IN ({})
             GROUP BY f.id ORDER BY hits DESC, {} LIMIT {}",
            RECORD_COLUMNS,
            placeholders.join(", "),
            POPULARITY_ORDER,
            limit
        );
        self.with_connection(|conn| query_records(conn, &sql, params_from_iter(keywords.iter())))
    }

    /// Records accessed at least once, most recent first
    pub fn recent_records(&self, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files f WHERE f.last_accessed IS NOT NULL
             ORDER BY f.last_accessed DESC, f.path LIMIT ?1",
            RECORD_COLUMNS
        );
        self.with_connection(|conn| query_records(conn, &sql, params![limit as i64]))
    }

    /// Records accessed at least once, highest access count first
    pub fn frequent_records(&self, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files f WHERE f.access_count > 0 ORDER BY {} LIMIT ?1",
            RECORD_COLUMNS, POPULARITY_ORDER
        );
        self.with_connection(|conn| query_records(conn, &sql, params![limit as i64]))
    }
}

fn upsert_in(
    tx: &Transaction<'_>,
    record: &FileRecord,
    keywords: &BTreeSet<String>,
) -> Result<RecordId> {
    let key = path_key(&record.path)?;
    let id: i64 = tx.query_row(
        "INSERT INTO files
            (path, name, name_lower, size, created_time, modified_time, file_type,
             is_directory, indexed_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(path) DO UPDATE SET
            name = excluded.name,
            name_lower = excluded.name_lower,
            size = excluded.size,
            created_time = excluded.created_time,
            modified_time = excluded.modified_time,
            file_type = excluded.file_type,
            is_directory = excluded.is_directory,
            indexed_time = excluded.indexed_time
         RETURNING id",
        params![
            key,
            record.name,
            record.name.to_lowercase(),
            record.size.map(|size| size as i64),
            record.created_time.as_ref().map(to_millis),
            record.modified_time.as_ref().map(to_millis),
            record.file_type,
            record.is_directory,
            to_millis(&record.indexed_time),
        ],
        |row| row.get(0),
    )?;

    tx.execute("DELETE FROM keywords WHERE file_id = ?1", params![id])?;
    let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO keywords (keyword, file_id, weight) VALUES (?1, ?2, ?3)",
    )?;
    for keyword in keywords {
        stmt.execute(params![keyword, id, KEYWORD_WEIGHT])?;
    }

    Ok(RecordId(id))
}

fn query_records(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let records =
        stmt.query_map(params, record_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Maps the leading [`RECORD_COLUMNS`] of a row
pub(crate) fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let path: String = row.get(0)?;
    let size: Option<i64> = row.get(2)?;
    let created: Option<i64> = row.get(3)?;
    let modified: Option<i64> = row.get(4)?;
    let access_count: i64 = row.get(7)?;
    let last_accessed: Option<i64> = row.get(8)?;
    let indexed: i64 = row.get(9)?;

    Ok(FileRecord {
        path: PathBuf::from(path),
        name: row.get(1)?,
        size: size.map(|size| size.max(0) as u64),
        created_time: created.and_then(from_millis),
        modified_time: modified.and_then(from_millis),
        file_type: row.get(5)?,
        is_directory: row.get(6)?,
        access_count: access_count.max(0) as u64,
        last_accessed: last_accessed.and_then(from_millis),
        indexed_time: from_millis(indexed).unwrap_or_default(),
    })
}

/// `%text%` with LIKE metacharacters escaped by `\`
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn keywords(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn store_with(paths: &[&str]) -> Store {
        let store = Store::open_in_memory().unwrap();
        for path in paths {
            let record = FileRecord::new(*path, false);
            let name = record.name.to_lowercase();
            store.upsert_record(&record, &keywords(&[&name])).unwrap();
        }
        store
    }

    fn names(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_upsert_keeps_id_and_access_stats() {
        let store = Store::open_in_memory().unwrap();
        let path = Path::new("/docs/report.pdf");
        let mut record = FileRecord::new(path, false);
        record.size = Some(10);

        let first = store.upsert_record(&record, &keywords(&["report"])).unwrap();
        store.record_access(path).unwrap();
        store.record_access(path).unwrap();

        record.size = Some(20);
        let second = store.upsert_record(&record, &keywords(&["report", "pdf"])).unwrap();

        assert_eq!(first, second);
        let stored = store.get_record(path).unwrap().unwrap();
        assert_eq!(stored.size, Some(20));
        assert_eq!(stored.access_count, 2);
        assert!(stored.last_accessed.is_some());
    }

    #[test]
    fn test_upsert_replaces_keywords() {
        let store = Store::open_in_memory().unwrap();
        let record = FileRecord::new("/docs/a.txt", false);
        store.upsert_record(&record, &keywords(&["old", "shared"])).unwrap();
        store.upsert_record(&record, &keywords(&["new", "shared"])).unwrap();

        assert_eq!(store.keywords_for(&record.path).unwrap(), vec!["new", "shared"]);
        assert!(store.query_by_keywords(&["old".to_string()], 10).unwrap().is_empty());
    }

    #[test]
    fn test_remove_record_cascades_keywords() {
        let store = store_with(&["/docs/a.txt"]);
        assert!(store.remove_record(Path::new("/docs/a.txt")).unwrap());
        assert!(!store.remove_record(Path::new("/docs/a.txt")).unwrap());
        assert_eq!(store.stats().unwrap().keywords, 0);
    }

    #[test]
    fn test_remove_tree_spares_sibling_prefixes() {
        let store = store_with(&["/a/b", "/a/b/c.txt", "/a/b/d/e.txt", "/a/bc/f.txt", "/a/x.txt"]);
        let removed = store.remove_tree(Path::new("/a/b")).unwrap();

        assert_eq!(removed, 3);
        assert!(store.get_record(Path::new("/a/bc/f.txt")).unwrap().is_some());
        assert!(store.get_record(Path::new("/a/x.txt")).unwrap().is_some());
        assert!(store.get_record(Path::new("/a/b/d/e.txt")).unwrap().is_none());
    }

    #[test]
    fn test_record_access_on_unknown_path_is_noop() {
        let store = store_with(&["/docs/a.txt"]);
        assert!(!store.record_access(Path::new("/nowhere.txt")).unwrap());
        assert_eq!(store.stats().unwrap().records(), 1);
    }

    #[test]
    fn test_name_queries_ignore_case_and_order_by_popularity() {
        let store = store_with(&["/one/Main.rs", "/two/main.rs", "/three/domain.rs"]);
        store.record_access(Path::new("/two/main.rs")).unwrap();

        let exact = store.query_by_name("MAIN.RS", 10).unwrap();
        assert_eq!(exact.len(), 2);
        assert_eq!(exact[0].path, PathBuf::from("/two/main.rs"));

        let partial = store.query_by_name_contains("main", 10).unwrap();
        assert_eq!(partial.len(), 3);
    }

    #[test]
    fn test_name_queries_fold_non_ascii_case() {
        let store = store_with(&["/notes/Ärger.txt", "/notes/ÉTÉ_plan.md"]);

        assert_eq!(names(&store.query_by_name("ärger.TXT", 10).unwrap()), ["Ärger.txt"]);
        assert_eq!(names(&store.query_by_name_contains("été", 10).unwrap()), ["ÉTÉ_plan.md"]);
    }

    #[test]
    fn test_like_metacharacters_are_literal() {
        let store = store_with(&["/d/100%_done.txt", "/d/1000.txt", "/d/a_b.txt", "/d/axb.txt"]);

        assert_eq!(names(&store.query_by_name_contains("100%", 10).unwrap()), ["100%_done.txt"]);
        assert_eq!(names(&store.query_by_name_contains("a_b", 10).unwrap()), ["a_b.txt"]);
    }

    #[test]
    fn test_path_contains() {
        let store = store_with(&["/proj/src/main.rs", "/proj/tests/main.rs"]);
        let found = store.query_by_path_contains("src/main", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/proj/src/main.rs"));
    }

    #[test]
    fn test_keyword_queries_rank_by_hits() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_record(&FileRecord::new("/a/one.txt", false), &keywords(&["rep", "epo"]))
            .unwrap();
        store
            .upsert_record(&FileRecord::new("/a/two.txt", false), &keywords(&["rep", "epo", "por"]))
            .unwrap();

        let grams = vec!["rep".to_string(), "epo".to_string(), "por".to_string()];
        let found = store.query_by_keywords(&grams, 10).unwrap();
        assert_eq!(names(&found), ["two.txt", "one.txt"]);

        let found = store.query_by_keyword_substring("PO", 10).unwrap();
        assert_eq!(names(&found), ["two.txt", "one.txt"]);
    }

    #[test]
    fn test_recent_and_frequent_lists() {
        let store = store_with(&["/a/old.txt", "/a/new.txt", "/a/never.txt"]);
        let now = Utc::now();
        store.record_access_at(Path::new("/a/old.txt"), now - Duration::days(3)).unwrap();
        store.record_access_at(Path::new("/a/old.txt"), now - Duration::days(2)).unwrap();
        store.record_access_at(Path::new("/a/new.txt"), now).unwrap();

        assert_eq!(names(&store.recent_records(10).unwrap()), ["new.txt", "old.txt"]);
        assert_eq!(names(&store.frequent_records(10).unwrap()), ["old.txt", "new.txt"]);
        assert_eq!(store.recent_records(1).unwrap().len(), 1);
    }

    #[test]
    fn test_writes_invalidate_cache() {
        let store = store_with(&["/a/x.txt"]);
        store.store_cached_results("q", &[]).unwrap();
        assert!(store.cached_results("q").unwrap().is_some());

        store.record_access(Path::new("/a/x.txt")).unwrap();
        assert!(store.cached_results("q").unwrap().is_none());

        store.store_cached_results("q", &[]).unwrap();
        store.upsert_record(&FileRecord::new("/a/y.txt", false), &BTreeSet::new()).unwrap();
        assert!(store.cached_results("q").unwrap().is_none());
    }

    #[test]
    fn test_contains_pattern_escapes() {
        assert_eq!(contains_pattern("a%b_c\\d"), "%a\\%b\\_c\\\\d%");
    }
}

//! Table layout and schema versioning

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{LocatorError, Result};

/// Stored in `PRAGMA user_version`; bump on any incompatible layout change
pub const SCHEMA_VERSION: i32 = 2;

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        name_lower TEXT NOT NULL,
        size INTEGER,
        created_time INTEGER,
        modified_time INTEGER,
        file_type TEXT,
        is_directory INTEGER NOT NULL DEFAULT 0,
        access_count INTEGER NOT NULL DEFAULT 0,
        last_accessed INTEGER,
        indexed_time INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS keywords (
        keyword TEXT NOT NULL,
        file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
        weight REAL NOT NULL DEFAULT 1.0,
        PRIMARY KEY (keyword, file_id)
    );

    CREATE TABLE IF NOT EXISTS search_cache (
        signature TEXT PRIMARY KEY,
        results TEXT NOT NULL,
        access_count INTEGER NOT NULL DEFAULT 0,
        last_accessed INTEGER NOT NULL,
        created_time INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_files_name_lower ON files(name_lower);
    CREATE INDEX IF NOT EXISTS idx_files_type ON files(file_type);
    CREATE INDEX IF NOT EXISTS idx_files_last_accessed ON files(last_accessed);
    CREATE INDEX IF NOT EXISTS idx_files_access_count ON files(access_count);
    CREATE INDEX IF NOT EXISTS idx_keywords_file ON keywords(file_id);
";

const DROP_TABLES: &str = "
    DROP TABLE IF EXISTS keywords;
    DROP TABLE IF EXISTS search_cache;
    DROP TABLE IF EXISTS files;
";

/// Connection-level settings applied on every open
pub(crate) fn configure(conn: &Connection, file_backed: bool) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    if file_backed {
        // journal_mode returns the resulting mode as a row
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
    }
    Ok(())
}

/// Creates the tables, rebuilding them when the on-disk version is older
///
/// A database written by a newer version is rejected rather than downgraded.
pub(crate) fn initialize(conn: &Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(LocatorError::Validation(format!(
            "Index schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    if version != 0 && version < SCHEMA_VERSION {
        info!("Index schema version {} is outdated, rebuilding tables", version);
        conn.execute_batch(DROP_TABLES)?;
    }

    conn.execute_batch(CREATE_TABLES)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    debug!("Index schema ready (version {})", SCHEMA_VERSION);
    Ok(())
}

//! Persistent record store backed by SQLite
//!
//! Three tables live in one database file:
//! - `files`: one row per indexed path with metadata and access statistics
//! - `keywords`: inverted index from lowercase keyword to file rows
//! - `search_cache`: JSON-serialized result lists keyed by query signature
//!
//! Default location: `<data dir>/findex/index.db`, relocatable with `FINDEX_HOME`
//! or the `storage.database_path` config setting.
//!
//! # Consistency
//!
//! Every write that changes a record or its access statistics runs in a single
//! transaction which also empties `search_cache`, so a cached result list never
//! outlives the rows it was computed from.

pub mod cache;
pub mod records;
pub mod schema;

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use tracing::info;

use crate::error::{LocatorError, Result};

/// Thread-safe handle to the index database
///
/// Shared between the indexer, the searcher and the watcher thread via `Arc`.
pub struct Store {
    conn: Mutex<Connection>,
}

/// Row counts reported by `findex stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub files: u64,
    pub directories: u64,
    pub keywords: u64,
    pub cache_entries: u64,
}

impl StoreStats {
    pub fn records(&self) -> u64 {
        self.files + self.directories
    }
}

impl Store {
    /// Opens (or creates) the database at `path`
    ///
    /// # Errors
    ///
    /// Fails if the parent directory cannot be created, the file is not a SQLite
    /// database, or its schema is newer than this build understands.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LocatorError::from_io(parent, e))?;
        }

        let conn = Connection::open(path)?;
        schema::configure(&conn, true)?;
        schema::initialize(&conn)?;
        info!("Opened index at {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::configure(&conn, false)?;
        schema::initialize(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Runs `f` inside a transaction, committing only if it succeeds
    pub(crate) fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs a read-only closure against the connection
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.with_connection(|conn| {
            let (files, directories): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(is_directory = 0), 0), COALESCE(SUM(is_directory = 1), 0)
                 FROM files",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let keywords: i64 =
                conn.query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
            let cache_entries: i64 =
                conn.query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))?;

            Ok(StoreStats {
                files: files as u64,
                directories: directories as u64,
                keywords: keywords as u64,
                cache_entries: cache_entries as u64,
            })
        })
    }

    /// Removes every record, keyword and cache entry
    pub fn clear_all(&self) -> Result<()> {
        self.with_transaction(|tx| {
            tx.execute_batch(
                "DELETE FROM keywords;
                 DELETE FROM files;
                 DELETE FROM search_cache;",
            )?;
            Ok(())
        })?;
        info!("Cleared index");
        Ok(())
    }
}

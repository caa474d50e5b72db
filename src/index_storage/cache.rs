//! Query result cache keyed by search signature

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::{debug, warn};

use super::Store;
use crate::error::Result;
use crate::models::SearchResult;
use crate::models::record::to_millis;

/// Empties the cache inside a write transaction
pub(crate) fn invalidate_cache(tx: &Transaction<'_>) -> Result<()> {
    tx.execute("DELETE FROM search_cache", [])?;
    Ok(())
}

impl Store {
    /// Cached result list for `signature`, bumping its access statistics on a hit
    ///
    /// An entry that no longer deserializes is dropped and reported as a miss.
    pub fn cached_results(&self, signature: &str) -> Result<Option<Vec<SearchResult>>> {
        self.with_transaction(|tx| {
            let json: Option<String> = tx
                .query_row(
                    "SELECT results FROM search_cache WHERE signature = ?1",
                    params![signature],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(json) = json else {
                return Ok(None);
            };

            match serde_json::from_str::<Vec<SearchResult>>(&json) {
                Ok(results) => {
                    tx.execute(
                        "UPDATE search_cache SET access_count = access_count + 1, last_accessed = ?2
                         WHERE signature = ?1",
                        params![signature, to_millis(&Utc::now())],
                    )?;
                    Ok(Some(results))
                }
                Err(e) => {
                    warn!("Dropping unreadable cache entry {:?}: {}", signature, e);
                    tx.execute(
                        "DELETE FROM search_cache WHERE signature = ?1",
                        params![signature],
                    )?;
                    Ok(None)
                }
            }
        })
    }

    /// Stores (or replaces) the result list for `signature`; empty lists are cached too
    pub fn store_cached_results(&self, signature: &str, results: &[SearchResult]) -> Result<()> {
        let json = serde_json::to_string(results)?;
        let now = to_millis(&Utc::now());
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO search_cache
                    (signature, results, access_count, last_accessed, created_time)
                 VALUES (?1, ?2, 0, ?3, ?3)
                 ON CONFLICT(signature) DO UPDATE SET
                    results = excluded.results,
                    last_accessed = excluded.last_accessed,
                    created_time = excluded.created_time",
                params![signature, json, now],
            )?;
            Ok(())
        })
    }

    /// Removes every cache entry; returns how many were dropped
    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self.with_transaction(|tx| Ok(tx.execute("DELETE FROM search_cache", [])?))?;
        debug!("Cleared {} cache entries", removed);
        Ok(removed)
    }

    /// Removes entries not read for more than `max_age_days`
    pub fn cleanup_cache(&self, max_age_days: u32) -> Result<usize> {
        self.cleanup_cache_at(max_age_days, Utc::now())
    }

    pub(crate) fn cleanup_cache_at(&self, max_age_days: u32, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(i64::from(max_age_days));
        let removed = self.with_transaction(|tx| {
            Ok(tx.execute(
                "DELETE FROM search_cache WHERE last_accessed < ?1",
                params![to_millis(&cutoff)],
            )?)
        })?;
        if removed > 0 {
            debug!("Purged {} stale cache entries", removed);
        }
        Ok(removed)
    }
}

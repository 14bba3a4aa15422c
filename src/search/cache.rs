//! Persistent query cache.
//!
//! Backs `search()` with a (query, category) -> ranked-results table.
//! A hit requires recent use; eviction is a deterministic sweep that runs
//! whenever a write pushes the table past its capacity, deleting aged
//! rows and trimming to the most-recently-used set.

use chrono::{Duration, Utc};
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use crate::catalog::model::{Category, OverlayInfo};
use crate::error::Result;
use crate::storage::{Database, timestamp};

/// Hits must be fresher than this.
const HIT_TTL_SECS: i64 = 3600;

/// Sweep cutoff: entries untouched this long are deleted.
const AGE_LIMIT_SECS: i64 = 24 * 3600;

/// MRU rows kept by a sweep.
const DEFAULT_MAX_ENTRIES: usize = 100;

/// Cache over the `search_cache` table.
pub struct SearchCache<'db> {
    db: &'db Database,
    max_entries: usize,
}

impl<'db> SearchCache<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_capacity(db: &'db Database, max_entries: usize) -> Self {
        Self { db, max_entries }
    }

    /// Cache key: hash of the normalized query plus category.
    pub fn query_hash(query: &str, category: Option<Category>) -> String {
        let key = format!(
            "{}:{}",
            query.trim().to_lowercase(),
            category.map(Category::as_str).unwrap_or_default()
        );
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Fresh cached results, bumping hit count and recency. A stale row is
    /// a miss; the sweep reclaims it later.
    pub fn get(&self, query: &str, category: Option<Category>) -> Result<Option<Vec<OverlayInfo>>> {
        let hash = Self::query_hash(query, category);
        let conn = self.db.conn();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT results_json, last_used FROM search_cache WHERE query_hash = ?1",
                [&hash],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((results_json, last_used)) = row else {
            return Ok(None);
        };

        let fresh = chrono::DateTime::parse_from_rfc3339(&last_used)
            .map(|dt| Utc::now() - dt.with_timezone(&Utc) < Duration::seconds(HIT_TTL_SECS))
            .unwrap_or(false);
        if !fresh {
            return Ok(None);
        }

        conn.execute(
            "UPDATE search_cache SET hit_count = hit_count + 1, last_used = ?1
             WHERE query_hash = ?2",
            params![timestamp(Utc::now()), hash],
        )?;

        match serde_json::from_str(&results_json) {
            Ok(results) => Ok(Some(results)),
            // A row that no longer deserializes is treated as a miss.
            Err(_) => Ok(None),
        }
    }

    /// Store results for a query, then enforce the capacity bound.
    pub fn put(
        &self,
        query: &str,
        category: Option<Category>,
        results: &[OverlayInfo],
    ) -> Result<()> {
        let hash = Self::query_hash(query, category);
        let now = timestamp(Utc::now());
        let results_json = serde_json::to_string(results)?;

        self.db.conn().execute(
            "INSERT OR REPLACE INTO search_cache
                 (query_hash, original_query, results_json, hit_count, created_at, last_used)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![hash, query, results_json, now],
        )?;

        if self.len()? > self.max_entries {
            self.sweep()?;
        }
        Ok(())
    }

    /// Delete aged entries and trim beyond the MRU capacity.
    pub fn sweep(&self) -> Result<usize> {
        let conn = self.db.conn();
        let cutoff = timestamp(Utc::now() - Duration::seconds(AGE_LIMIT_SECS));

        let aged = conn.execute(
            "DELETE FROM search_cache WHERE last_used < ?1",
            [&cutoff],
        )?;
        let trimmed = conn.execute(
            "DELETE FROM search_cache WHERE query_hash NOT IN (
                 SELECT query_hash FROM search_cache ORDER BY last_used DESC LIMIT ?1
             )",
            [self.max_entries as i64],
        )?;
        if aged + trimmed > 0 {
            tracing::debug!("cache sweep removed {} entries", aged + trimmed);
        }
        Ok(aged + trimmed)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 =
            self.db
                .conn()
                .query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Recorded hit count for a query, if cached.
    pub fn hit_count(&self, query: &str, category: Option<Category>) -> Result<Option<u64>> {
        let hash = Self::query_hash(query, category);
        let count: Option<i64> = self
            .db
            .conn()
            .query_row(
                "SELECT hit_count FROM search_cache WHERE query_hash = ?1",
                [&hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }

    pub fn clear(&self) -> Result<()> {
        self.db.conn().execute("DELETE FROM search_cache", [])?;
        Ok(())
    }
}

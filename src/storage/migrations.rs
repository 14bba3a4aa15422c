//! Schema migrations
//!
//! Versioned via `PRAGMA user_version`. Each migration runs inside a
//! transaction; a partially applied migration never bumps the version.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Run all pending migrations, returning the resulting schema version.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let mut version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

    while version < SCHEMA_VERSION {
        let next = version + 1;
        conn.execute_batch("BEGIN;")?;
        match apply(conn, next) {
            Ok(()) => {
                conn.execute_batch(&format!("PRAGMA user_version = {next}; COMMIT;"))?;
                version = next;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK;");
                return Err(e);
            }
        }
    }

    Ok(version)
}

fn apply(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        other => unreachable!("no migration defined for version {other}"),
    }
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS overlays (
             name TEXT PRIMARY KEY,
             alias TEXT,
             path TEXT,
             filename TEXT,
             weight REAL NOT NULL DEFAULT 1.0,
             category TEXT NOT NULL DEFAULT 'general',
             content_rating TEXT NOT NULL DEFAULT 'safe',
             description TEXT,
             trigger_words TEXT,
             metadata TEXT,
             created_at TEXT NOT NULL,
             updated_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS sync_state (
             id INTEGER PRIMARY KEY,
             last_sync_check TEXT NOT NULL,
             overlay_count INTEGER NOT NULL DEFAULT 0,
             catalog_hash TEXT NOT NULL DEFAULT '',
             cache_version INTEGER NOT NULL DEFAULT 1,
             sync_duration_ms INTEGER NOT NULL DEFAULT 0
         );

         CREATE TABLE IF NOT EXISTS search_cache (
             query_hash TEXT PRIMARY KEY,
             original_query TEXT NOT NULL,
             results_json TEXT NOT NULL,
             hit_count INTEGER NOT NULL DEFAULT 1,
             created_at TEXT NOT NULL,
             last_used TEXT NOT NULL
         );

         CREATE INDEX IF NOT EXISTS idx_overlays_category ON overlays(category);
         CREATE INDEX IF NOT EXISTS idx_overlays_trigger_words ON overlays(trigger_words);
         CREATE INDEX IF NOT EXISTS idx_overlays_name_search ON overlays(name);
         CREATE INDEX IF NOT EXISTS idx_overlays_description_search ON overlays(description);
         CREATE INDEX IF NOT EXISTS idx_cache_last_used ON search_cache(last_used DESC);",
    )?;
    Ok(())
}

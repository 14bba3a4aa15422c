//! Storage layer for loradex
//!
//! SQLite persistence for the overlay catalog, sync bookkeeping, and the
//! search cache.

pub mod migrations;
pub mod sqlite;

use chrono::{DateTime, SecondsFormat, Utc};

pub use sqlite::Database;

/// Timestamps are stored as RFC 3339 text with fixed-width microseconds,
/// so lexicographic order in SQL matches chronological order.
pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

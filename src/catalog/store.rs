//! Persistent overlay store.
//!
//! One row per overlay plus sync bookkeeping. Overlay rows are written
//! only by the sync engine (and the manual metadata override); this
//! subsystem never deletes them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::catalog::model::{Category, ContentRating, Overlay, OverlayInfo, SyncState};
use crate::error::Result;
use crate::storage::{Database, timestamp};

/// Fields the sync engine writes on an upsert. `weight` applies only on
/// insert; an existing row keeps its caller-tuned weight.
#[derive(Debug, Clone)]
pub struct UpsertOverlay {
    pub name: String,
    pub alias: String,
    pub path: String,
    pub category: Category,
    pub content_rating: ContentRating,
    pub description: String,
    pub trigger_words: Vec<String>,
    pub metadata: serde_json::Value,
}

/// Aggregated catalog view: counts per category and the most common
/// trigger words across the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub categories: Vec<(String, usize)>,
    pub top_trigger_words: Vec<(String, usize)>,
}

/// Query interface over the `overlays` and `sync_state` tables.
pub struct CatalogStore<'db> {
    db: &'db Database,
}

impl<'db> CatalogStore<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Insert or update by name. Returns true when a new row was inserted.
    pub fn upsert(&self, overlay: &UpsertOverlay) -> Result<bool> {
        let conn = self.db.conn();
        let now = timestamp(Utc::now());
        let triggers = serde_json::to_string(&overlay.trigger_words)?;
        let metadata = serde_json::to_string(&overlay.metadata)?;

        let exists: Option<String> = conn
            .query_row(
                "SELECT name FROM overlays WHERE name = ?1",
                [&overlay.name],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_some() {
            conn.execute(
                "UPDATE overlays SET
                     alias = ?1, path = ?2, category = ?3, content_rating = ?4,
                     trigger_words = ?5, description = ?6, metadata = ?7, updated_at = ?8
                 WHERE name = ?9",
                params![
                    overlay.alias,
                    overlay.path,
                    overlay.category.as_str(),
                    overlay.content_rating.as_str(),
                    triggers,
                    overlay.description,
                    metadata,
                    now,
                    overlay.name,
                ],
            )?;
            Ok(false)
        } else {
            let filename = filename_of(&overlay.path);
            conn.execute(
                "INSERT INTO overlays
                     (name, alias, path, filename, weight, category, content_rating,
                      description, trigger_words, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1.0, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    overlay.name,
                    overlay.alias,
                    overlay.path,
                    filename,
                    overlay.category.as_str(),
                    overlay.content_rating.as_str(),
                    overlay.description,
                    triggers,
                    metadata,
                    now,
                ],
            )?;
            Ok(true)
        }
    }

    /// Full row by name.
    pub fn get(&self, name: &str) -> Result<Option<Overlay>> {
        self.db
            .conn()
            .query_row(
                "SELECT name, alias, path, filename, weight, category, content_rating,
                        description, trigger_words, metadata, created_at, updated_at
                 FROM overlays WHERE name = ?1",
                [name],
                map_overlay,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Caller-facing projection by name.
    pub fn info(&self, name: &str) -> Result<Option<OverlayInfo>> {
        Ok(self.get(name)?.map(|o| OverlayInfo::from(&o)))
    }

    /// Every overlay in the catalog.
    pub fn all(&self) -> Result<Vec<Overlay>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT name, alias, path, filename, weight, category, content_rating,
                    description, trigger_words, metadata, created_at, updated_at
             FROM overlays ORDER BY name",
        )?;
        let rows = stmt.query_map([], map_overlay)?;
        let mut overlays = Vec::new();
        for row in rows {
            overlays.push(row?);
        }
        Ok(overlays)
    }

    pub fn names(&self) -> Result<HashSet<String>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT name FROM overlays")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = HashSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.db
                .conn()
                .query_row("SELECT COUNT(*) FROM overlays", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Substring search over name, description, and trigger words.
    pub fn search_text(
        &self,
        query: &str,
        category: Option<Category>,
    ) -> Result<Vec<OverlayInfo>> {
        let conn = self.db.conn();
        let pattern = format!("%{}%", query.to_lowercase());

        let mut sql = String::from(
            "SELECT name, alias, path, filename, weight, category, content_rating,
                    description, trigger_words, metadata, created_at, updated_at
             FROM overlays
             WHERE (lower(name) LIKE ?1 OR lower(description) LIKE ?1
                    OR lower(trigger_words) LIKE ?1)",
        );
        if category.is_some() {
            sql.push_str(" AND category = ?2");
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = conn.prepare(&sql)?;
        let mut results = Vec::new();
        let map = |row: &Row<'_>| map_overlay(row);
        if let Some(cat) = category {
            let rows = stmt.query_map(params![pattern, cat.as_str()], map)?;
            for row in rows {
                results.push(OverlayInfo::from(&row?));
            }
        } else {
            let rows = stmt.query_map(params![pattern], map)?;
            for row in rows {
                results.push(OverlayInfo::from(&row?));
            }
        }
        Ok(results)
    }

    pub fn by_category(&self, category: Category, limit: usize) -> Result<Vec<OverlayInfo>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT name, alias, path, filename, weight, category, content_rating,
                    description, trigger_words, metadata, created_at, updated_at
             FROM overlays WHERE category = ?1 ORDER BY name LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![category.as_str(), limit as i64], map_overlay)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(OverlayInfo::from(&row?));
        }
        Ok(results)
    }

    /// Manual metadata override. Returns false when the overlay is absent.
    pub fn update_metadata(
        &self,
        name: &str,
        trigger_words: Option<&[String]>,
        category: Option<Category>,
        description: Option<&str>,
    ) -> Result<bool> {
        let conn = self.db.conn();
        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(triggers) = trigger_words {
            sets.push(format!("trigger_words = ?{}", values.len() + 1));
            values.push(Box::new(serde_json::to_string(triggers)?));
        }
        if let Some(cat) = category {
            sets.push(format!("category = ?{}", values.len() + 1));
            values.push(Box::new(cat.as_str().to_string()));
        }
        if let Some(desc) = description {
            sets.push(format!("description = ?{}", values.len() + 1));
            values.push(Box::new(desc.to_string()));
        }
        if sets.is_empty() {
            return Ok(false);
        }

        sets.push(format!("updated_at = ?{}", values.len() + 1));
        values.push(Box::new(timestamp(Utc::now())));
        let name_idx = values.len() + 1;
        values.push(Box::new(name.to_string()));

        let sql = format!(
            "UPDATE overlays SET {} WHERE name = ?{name_idx}",
            sets.join(", ")
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let changed = conn.execute(&sql, refs.as_slice())?;
        Ok(changed > 0)
    }

    /// Category counts plus the ten most common trigger words.
    pub fn summary(&self) -> Result<CatalogSummary> {
        let conn = self.db.conn();

        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM overlays GROUP BY category ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        let mut categories = Vec::new();
        let mut total = 0;
        for row in rows {
            let (cat, count) = row?;
            total += count;
            categories.push((cat, count));
        }

        let mut stmt = conn.prepare(
            "SELECT trigger_words FROM overlays
             WHERE trigger_words IS NOT NULL AND trigger_words != ''",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for row in rows {
            let raw = row?;
            // Rows predating trigger extraction may hold junk; skip them.
            if let Ok(triggers) = serde_json::from_str::<Vec<String>>(&raw) {
                for trigger in triggers {
                    *counts.entry(trigger).or_default() += 1;
                }
            }
        }
        let mut top: Vec<(String, usize)> = counts.into_iter().collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(10);

        Ok(CatalogSummary {
            total,
            categories,
            top_trigger_words: top,
        })
    }

    /// Latest sync bookkeeping row, if any sync has been attempted.
    pub fn latest_sync_state(&self) -> Result<Option<SyncState>> {
        self.db
            .conn()
            .query_row(
                "SELECT id, last_sync_check, overlay_count, catalog_hash, cache_version,
                        sync_duration_ms
                 FROM sync_state ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RawSyncState {
                        id: row.get(0)?,
                        last_sync_check: row.get(1)?,
                        overlay_count: row.get(2)?,
                        catalog_hash: row.get(3)?,
                        cache_version: row.get(4)?,
                        sync_duration_ms: row.get(5)?,
                    })
                },
            )
            .optional()?
            .map(RawSyncState::into_sync_state)
            .transpose()
    }

    /// Append one bookkeeping row for a sync attempt.
    pub fn append_sync_state(
        &self,
        overlay_count: usize,
        catalog_hash: &str,
        sync_duration_ms: u64,
    ) -> Result<()> {
        self.db.conn().execute(
            "INSERT INTO sync_state
                 (last_sync_check, overlay_count, catalog_hash, cache_version, sync_duration_ms)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                timestamp(Utc::now()),
                overlay_count as i64,
                catalog_hash,
                sync_duration_ms as i64,
            ],
        )?;
        Ok(())
    }
}

struct RawSyncState {
    id: i64,
    last_sync_check: String,
    overlay_count: i64,
    catalog_hash: String,
    cache_version: i64,
    sync_duration_ms: i64,
}

impl RawSyncState {
    fn into_sync_state(self) -> Result<SyncState> {
        Ok(SyncState {
            id: self.id,
            last_sync_check: parse_timestamp(&self.last_sync_check),
            overlay_count: self.overlay_count as usize,
            catalog_hash: self.catalog_hash,
            cache_version: self.cache_version as u32,
            sync_duration_ms: self.sync_duration_ms as u64,
        })
    }
}

fn map_overlay(row: &Row<'_>) -> rusqlite::Result<Overlay> {
    let category: String = row.get(5)?;
    let rating: String = row.get(6)?;
    let triggers: Option<String> = row.get(8)?;
    let metadata: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Overlay {
        name: row.get(0)?,
        alias: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        filename: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        weight: row.get(4)?,
        category: category.parse().unwrap_or_default(),
        content_rating: rating.parse().unwrap_or_default(),
        description: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        trigger_words: triggers
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default(),
        metadata: metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(serde_json::Value::Null),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn filename_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, category: Category) -> UpsertOverlay {
        UpsertOverlay {
            name: name.to_string(),
            alias: format!("{name}-alias"),
            path: format!("loras/{name}.safetensors"),
            category,
            content_rating: ContentRating::Safe,
            description: format!("Trained on: {name}"),
            trigger_words: vec![name.to_string(), "test".to_string()],
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_upsert_insert_then_update() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        assert!(store.upsert(&sample("glow", Category::Style)).unwrap());
        assert!(!store.upsert(&sample("glow", Category::Anime)).unwrap());
        assert_eq!(store.count().unwrap(), 1);

        let overlay = store.get("glow").unwrap().unwrap();
        assert_eq!(overlay.category, Category::Anime);
        assert_eq!(overlay.filename, "glow.safetensors");
    }

    #[test]
    fn test_update_preserves_weight_and_created_at() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        store.upsert(&sample("glow", Category::Style)).unwrap();
        db.conn()
            .execute("UPDATE overlays SET weight = 0.8 WHERE name = 'glow'", [])
            .unwrap();
        let before = store.get("glow").unwrap().unwrap();

        store.upsert(&sample("glow", Category::Style)).unwrap();
        let after = store.get("glow").unwrap().unwrap();
        assert!((after.weight - 0.8).abs() < f64::EPSILON);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_trigger_words_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        let mut overlay = sample("neon_city", Category::Concept);
        overlay.trigger_words = vec![
            "cyberpunk".to_string(),
            "neon".to_string(),
            "city".to_string(),
        ];
        store.upsert(&overlay).unwrap();

        let loaded = store.get("neon_city").unwrap().unwrap();
        assert_eq!(loaded.trigger_words, overlay.trigger_words);
    }

    #[test]
    fn test_search_text_matches_triggers_and_category_filter() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        store.upsert(&sample("inkwash", Category::Style)).unwrap();
        store.upsert(&sample("photoreal", Category::Realistic)).unwrap();

        let hits = store.search_text("inkwash", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "inkwash");

        // "test" is a trigger on both rows; category narrows it
        let hits = store.search_text("test", Some(Category::Realistic)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "photoreal");
    }

    #[test]
    fn test_update_metadata() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        store.upsert(&sample("glow", Category::General)).unwrap();
        let changed = store
            .update_metadata(
                "glow",
                Some(&["soft glow".to_string()]),
                Some(Category::Style),
                Some("hand-tuned"),
            )
            .unwrap();
        assert!(changed);

        let overlay = store.get("glow").unwrap().unwrap();
        assert_eq!(overlay.trigger_words, vec!["soft glow"]);
        assert_eq!(overlay.category, Category::Style);
        assert_eq!(overlay.description, "hand-tuned");

        assert!(!store.update_metadata("missing", None, None, Some("x")).unwrap());
    }

    #[test]
    fn test_summary_counts() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        store.upsert(&sample("a", Category::Style)).unwrap();
        store.upsert(&sample("b", Category::Style)).unwrap();
        store.upsert(&sample("c", Category::Anime)).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.categories[0], ("style".to_string(), 2));
        // "test" is a trigger on every row
        assert_eq!(summary.top_trigger_words[0], ("test".to_string(), 3));
    }

    #[test]
    fn test_sync_state_append_and_latest() {
        let db = Database::open_in_memory().unwrap();
        let store = CatalogStore::new(&db);

        assert!(store.latest_sync_state().unwrap().is_none());
        store.append_sync_state(3, "abc", 42).unwrap();
        store.append_sync_state(4, "def", 7).unwrap();

        let latest = store.latest_sync_state().unwrap().unwrap();
        assert_eq!(latest.overlay_count, 4);
        assert_eq!(latest.catalog_hash, "def");
        assert_eq!(latest.sync_duration_ms, 7);
    }
}

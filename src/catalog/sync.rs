//! Incremental catalog synchronization.
//!
//! Change detection is count + content hash over the upstream listing. A
//! same-multiset rename/swap can slip past it; that approximation is
//! accepted in exchange for a cheap early exit on the common no-change
//! case.

use std::time::Instant;

use sha2::{Digest, Sha256};

use crate::analyze::MetadataAnalyzer;
use crate::catalog::model::{OverlayEntry, SyncOutcome};
use crate::catalog::source::CatalogSource;
use crate::catalog::store::{CatalogStore, UpsertOverlay};
use crate::error::Result;
use crate::storage::Database;

/// Drives one sync pass: fetch, detect change, re-derive metadata, upsert.
pub struct SyncEngine<'a> {
    db: &'a Database,
    source: &'a dyn CatalogSource,
    analyzer: MetadataAnalyzer,
}

impl<'a> SyncEngine<'a> {
    pub fn new(db: &'a Database, source: &'a dyn CatalogSource) -> Self {
        Self {
            db,
            source,
            analyzer: MetadataAnalyzer::new(),
        }
    }

    /// Content hash over the sorted `name:path` pairs of a listing.
    pub fn catalog_hash(entries: &[OverlayEntry]) -> String {
        let mut pairs: Vec<String> = entries
            .iter()
            .map(|entry| format!("{}:{}", entry.name, entry.path))
            .collect();
        pairs.sort();

        let mut hasher = Sha256::new();
        hasher.update(pairs.join("|").as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Run one sync attempt. A source failure propagates before any write;
    /// per-overlay metadata failures degrade to name/path heuristics.
    /// Every attempt, skipped or not, appends a sync-state row.
    pub fn sync(&self) -> Result<SyncOutcome> {
        let started = Instant::now();
        let store = CatalogStore::new(self.db);

        let entries = self.source.list()?;
        let current_hash = Self::catalog_hash(&entries);
        let current_count = entries.len();

        let decision = match store.latest_sync_state()? {
            None => Some("no previous sync state".to_string()),
            Some(state) if state.overlay_count != current_count => Some(format!(
                "overlay count changed: {} -> {current_count}",
                state.overlay_count
            )),
            Some(state) if state.catalog_hash != current_hash => {
                Some("catalog content changed".to_string())
            }
            Some(_) => None,
        };

        let local_names = store.names()?;
        let stale = local_names
            .iter()
            .filter(|name| !entries.iter().any(|entry| &entry.name == *name))
            .count();

        let Some(reason) = decision else {
            let elapsed = started.elapsed().as_millis() as u64;
            store.append_sync_state(current_count, &current_hash, elapsed)?;
            tracing::debug!("sync skipped: no changes detected");
            return Ok(SyncOutcome {
                updated: 0,
                skipped: true,
                reason: "no changes detected".to_string(),
                stale,
            });
        };

        tracing::info!("syncing catalog: {reason}");
        let mut updated = 0usize;
        for entry in &entries {
            let analysis = self.analyzer.analyze(entry);
            let result = store.upsert(&UpsertOverlay {
                name: entry.name.clone(),
                alias: entry.alias.clone(),
                path: entry.path.clone(),
                category: analysis.category,
                content_rating: analysis.content_rating,
                description: analysis.description,
                trigger_words: analysis.trigger_words,
                metadata: entry.metadata.clone(),
            });
            match result {
                Ok(_) => updated += 1,
                Err(err) => {
                    tracing::error!(
                        "sync aborted after {updated}/{} overlays: {err}",
                        entries.len()
                    );
                    return Err(err);
                }
            }
        }

        let elapsed = started.elapsed().as_millis() as u64;
        store.append_sync_state(current_count, &current_hash, elapsed)?;
        tracing::info!("sync complete: {updated} updated, {current_count} total ({elapsed}ms)");

        Ok(SyncOutcome {
            updated,
            skipped: false,
            reason,
            stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::Category;
    use crate::catalog::source::StaticSource;
    use serde_json::json;

    fn entry(name: &str, path: &str) -> OverlayEntry {
        OverlayEntry {
            name: name.to_string(),
            alias: String::new(),
            path: path.to_string(),
            metadata: json!({}),
        }
    }

    #[test]
    fn test_hash_is_order_independent() {
        let a = vec![entry("a", "1"), entry("b", "2")];
        let b = vec![entry("b", "2"), entry("a", "1")];
        assert_eq!(SyncEngine::catalog_hash(&a), SyncEngine::catalog_hash(&b));
    }

    #[test]
    fn test_hash_changes_on_rename() {
        let a = vec![entry("a", "1")];
        let b = vec![entry("a2", "1")];
        assert_ne!(SyncEngine::catalog_hash(&a), SyncEngine::catalog_hash(&b));
    }

    #[test]
    fn test_first_sync_populates_and_second_skips() {
        let db = Database::open_in_memory().unwrap();
        let source = StaticSource::new(vec![entry("glow", "loras/glow.safetensors")]);
        let engine = SyncEngine::new(&db, &source);

        let first = engine.sync().unwrap();
        assert!(!first.skipped);
        assert_eq!(first.updated, 1);
        assert_eq!(first.reason, "no previous sync state");

        let second = engine.sync().unwrap();
        assert!(second.skipped);
        assert_eq!(second.updated, 0);
        assert_eq!(second.reason, "no changes detected");
    }

    #[test]
    fn test_skipped_attempt_still_appends_state() {
        let db = Database::open_in_memory().unwrap();
        let source = StaticSource::new(vec![entry("glow", "p")]);
        let engine = SyncEngine::new(&db, &source);

        engine.sync().unwrap();
        engine.sync().unwrap();

        let attempts: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM sync_state", [], |row| row.get(0))
            .unwrap();
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_count_change_forces_sync() {
        let db = Database::open_in_memory().unwrap();
        {
            let source = StaticSource::new(vec![entry("a", "1")]);
            SyncEngine::new(&db, &source).sync().unwrap();
        }
        let source = StaticSource::new(vec![entry("a", "1"), entry("b", "2")]);
        let outcome = SyncEngine::new(&db, &source).sync().unwrap();
        assert!(!outcome.skipped);
        assert!(outcome.reason.contains("count changed"));
        assert_eq!(outcome.updated, 2);
    }

    #[test]
    fn test_rename_detected_via_hash() {
        let db = Database::open_in_memory().unwrap();
        {
            let source = StaticSource::new(vec![entry("a", "1")]);
            SyncEngine::new(&db, &source).sync().unwrap();
        }
        let source = StaticSource::new(vec![entry("a_renamed", "1")]);
        let outcome = SyncEngine::new(&db, &source).sync().unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.reason, "catalog content changed");
        // leave-stale: the old row survives and is reported
        assert_eq!(outcome.stale, 1);
        assert_eq!(CatalogStore::new(&db).count().unwrap(), 2);
    }

    #[test]
    fn test_malformed_metadata_degrades_per_overlay() {
        let db = Database::open_in_memory().unwrap();
        let source = StaticSource::new(vec![
            OverlayEntry {
                name: "anime_bloom".to_string(),
                alias: String::new(),
                path: "loras/anime_bloom.safetensors".to_string(),
                metadata: json!({"ss_tag_frequency": "{broken"}),
            },
            OverlayEntry {
                name: "clean".to_string(),
                alias: String::new(),
                path: "loras/clean.safetensors".to_string(),
                metadata: json!({"ss_tag_frequency": {"set": {"watercolor": 40, "painting": 22}}}),
            },
        ]);
        let outcome = SyncEngine::new(&db, &source).sync().unwrap();
        assert_eq!(outcome.updated, 2);

        let store = CatalogStore::new(&db);
        // the broken one fell back to name heuristics
        let bloom = store.get("anime_bloom").unwrap().unwrap();
        assert_eq!(bloom.category, Category::Anime);
        assert!(bloom.description.contains("inferred from filename"));
        // the clean one classified from its histogram
        let clean = store.get("clean").unwrap().unwrap();
        assert_eq!(clean.category, Category::Style);
    }

    #[test]
    fn test_source_failure_propagates_with_no_partial_write() {
        struct FailingSource;
        impl CatalogSource for FailingSource {
            fn list(&self) -> Result<Vec<OverlayEntry>> {
                Err(crate::error::LdxError::SourceUnavailable(
                    "backend offline".to_string(),
                ))
            }
        }

        let db = Database::open_in_memory().unwrap();
        let err = SyncEngine::new(&db, &FailingSource).sync().unwrap_err();
        assert!(matches!(
            err,
            crate::error::LdxError::SourceUnavailable(_)
        ));
        assert_eq!(CatalogStore::new(&db).count().unwrap(), 0);
        assert!(CatalogStore::new(&db).latest_sync_state().unwrap().is_none());
    }
}

//! Catalog service facade.
//!
//! Owns the database, the injected catalog source, and the query cache,
//! and exposes the async operations callers use. Blocking storage work is
//! off-loaded to the runtime's worker pool so it never stalls the
//! cooperative scheduler. Sync is single-writer; readers tolerate an
//! eventually-consistent catalog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::catalog::model::{
    Category, OverlayInfo, Selection, Suggestion, SyncOutcome, SyncState, Validation,
};
use crate::catalog::source::CatalogSource;
use crate::catalog::store::{CatalogStore, CatalogSummary};
use crate::catalog::sync::SyncEngine;
use crate::config::Config;
use crate::error::{LdxError, Result};
use crate::search::cache::SearchCache;
use crate::search::suggest::SuggestionRanker;
use crate::storage::Database;
use crate::validate::{CombinationValidator, WeightPreset, optimize_weights};

struct Inner {
    db: Mutex<Database>,
    source: Box<dyn CatalogSource>,
    config: Config,
    /// Keeps sync single-writer across concurrent callers.
    sync_lock: tokio::sync::Mutex<()>,
    synced: AtomicBool,
}

/// The overlay catalog subsystem. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct OverlayCatalog {
    inner: Arc<Inner>,
}

impl OverlayCatalog {
    /// All collaborators are injected here; nothing is discovered through
    /// globals, and construction performs no background work.
    pub fn new(db: Database, source: impl CatalogSource + 'static, config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                db: Mutex::new(db),
                source: Box::new(source),
                config,
                sync_lock: tokio::sync::Mutex::new(()),
                synced: AtomicBool::new(false),
            }),
        }
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|err| LdxError::TaskFailed(err.to_string()))?
    }

    /// Sync once before first use. Invoke from the owning service rather
    /// than relying on construction-time side effects.
    pub async fn ensure_synced(&self) -> Result<()> {
        if self.inner.synced.load(Ordering::Acquire) {
            return Ok(());
        }
        self.sync().await?;
        Ok(())
    }

    /// Run one sync attempt against the catalog source.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let _guard = self.inner.sync_lock.lock().await;
        let outcome = self
            .run_blocking(|inner| {
                let db = lock_db(&inner.db);
                SyncEngine::new(&db, inner.source.as_ref()).sync()
            })
            .await?;
        self.inner.synced.store(true, Ordering::Release);
        Ok(outcome)
    }

    /// Cached substring search over the catalog. Empty results are a
    /// normal outcome, never an error.
    pub async fn search(
        &self,
        query: String,
        category: Option<Category>,
        limit: Option<usize>,
    ) -> Result<Vec<OverlayInfo>> {
        let limit = limit.unwrap_or(self.inner.config.suggest.search_limit);
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            let cache = SearchCache::with_capacity(&db, inner.config.cache.max_entries);

            if let Some(mut cached) = cache.get(&query, category)? {
                cached.truncate(limit);
                return Ok(cached);
            }

            let mut results = CatalogStore::new(&db).search_text(&query, category)?;
            if !results.is_empty() {
                cache.put(&query, category, &results)?;
            }
            results.truncate(limit);
            Ok(results)
        })
        .await
    }

    /// Rank overlays against a free-text prompt.
    pub async fn suggest_for_prompt(
        &self,
        prompt: String,
        limit: Option<usize>,
    ) -> Result<Vec<Suggestion>> {
        let limit = limit.unwrap_or(self.inner.config.suggest.limit);
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            let overlays = CatalogStore::new(&db).all()?;
            Ok(SuggestionRanker::new().suggest(&overlays, &prompt, limit))
        })
        .await
    }

    /// Validate a chosen overlay set for weight and category conflicts.
    pub async fn validate_combination(&self, selection: Vec<Selection>) -> Result<Validation> {
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            CombinationValidator::new(&db).validate(&selection)
        })
        .await
    }

    /// Apply a named weight preset to a selection. Pure computation.
    pub fn optimize_weights(&self, selection: &[Selection], preset: WeightPreset) -> Vec<Selection> {
        optimize_weights(selection, preset)
    }

    pub async fn info(&self, name: String) -> Result<Option<OverlayInfo>> {
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            CatalogStore::new(&db).info(&name)
        })
        .await
    }

    pub async fn by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<OverlayInfo>> {
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            CatalogStore::new(&db).by_category(category, limit)
        })
        .await
    }

    pub async fn summary(&self) -> Result<CatalogSummary> {
        self.run_blocking(|inner| {
            let db = lock_db(&inner.db);
            CatalogStore::new(&db).summary()
        })
        .await
    }

    /// Manual metadata override for one overlay.
    pub async fn update_metadata(
        &self,
        name: String,
        trigger_words: Option<Vec<String>>,
        category: Option<Category>,
        description: Option<String>,
    ) -> Result<bool> {
        self.run_blocking(move |inner| {
            let db = lock_db(&inner.db);
            CatalogStore::new(&db).update_metadata(
                &name,
                trigger_words.as_deref(),
                category,
                description.as_deref(),
            )
        })
        .await
    }

    /// Latest sync bookkeeping row.
    pub async fn sync_state(&self) -> Result<Option<SyncState>> {
        self.run_blocking(|inner| {
            let db = lock_db(&inner.db);
            CatalogStore::new(&db).latest_sync_state()
        })
        .await
    }

    /// Whether first-use sync is configured.
    pub fn auto_sync(&self) -> bool {
        self.inner.config.catalog.auto_sync
    }
}

fn lock_db(db: &Mutex<Database>) -> std::sync::MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Layered configuration.
//!
//! Defaults, overlaid by the global config file, overlaid by the
//! project-root config file, overlaid by environment variables. An
//! explicit `--config` path replaces the file layers entirely.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LdxError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Overlay manifest exported by the generation backend.
    pub manifest: Option<PathBuf>,
    /// Sync on first use (`ensure_synced`).
    pub auto_sync: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            auto_sync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// MRU rows kept by the search cache.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Default suggestion count.
    pub limit: usize,
    /// Default search result count.
    pub search_limit: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            search_limit: 10,
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("LORADEX_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let path = dirs::config_dir()
            .ok_or_else(|| LdxError::MissingConfig("config directory not found".to_string()))?
            .join("loradex/config.toml");
        Self::load_patch(&path)
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        let path = root.join("config.toml");
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| LdxError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| LdxError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(manifest) = catalog.manifest {
                self.catalog.manifest = Some(manifest);
            }
            if let Some(auto_sync) = catalog.auto_sync {
                self.catalog.auto_sync = auto_sync;
            }
        }
        if let Some(cache) = patch.cache {
            if let Some(max_entries) = cache.max_entries {
                self.cache.max_entries = max_entries;
            }
        }
        if let Some(suggest) = patch.suggest {
            if let Some(limit) = suggest.limit {
                self.suggest.limit = limit;
            }
            if let Some(search_limit) = suggest.search_limit {
                self.suggest.search_limit = search_limit;
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(manifest) = std::env::var("LORADEX_MANIFEST") {
            if !manifest.is_empty() {
                self.catalog.manifest = Some(PathBuf::from(manifest));
            }
        }
        if let Ok(auto_sync) = std::env::var("LORADEX_AUTO_SYNC") {
            if let Ok(flag) = auto_sync.parse::<bool>() {
                self.catalog.auto_sync = flag;
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    cache: Option<CachePatch>,
    suggest: Option<SuggestPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    manifest: Option<PathBuf>,
    auto_sync: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    max_entries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestPatch {
    limit: Option<usize>,
    search_limit: Option<usize>,
}

//! Catalog source collaborator.
//!
//! The generation backend owns the authoritative overlay list; this crate
//! only consumes it. Implementations are injected into the sync engine at
//! construction time. The shipped [`ManifestSource`] reads the manifest
//! JSON the backend exports; transport to a live backend is out of scope.

use std::path::{Path, PathBuf};

use crate::catalog::model::OverlayEntry;
use crate::error::{LdxError, Result};

/// Lists the overlays the backend currently knows about.
///
/// A listing failure is fatal to sync and must surface as
/// [`LdxError::SourceUnavailable`].
pub trait CatalogSource: Send + Sync {
    fn list(&self) -> Result<Vec<OverlayEntry>>;
}

/// Reads overlay entries from a JSON manifest file: an array of
/// `{name, alias, path, metadata}` objects.
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for ManifestSource {
    fn list(&self) -> Result<Vec<OverlayEntry>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|err| {
            LdxError::SourceUnavailable(format!("read manifest {}: {err}", self.path.display()))
        })?;
        let entries: Vec<OverlayEntry> = serde_json::from_str(&raw).map_err(|err| {
            LdxError::SourceUnavailable(format!("parse manifest {}: {err}", self.path.display()))
        })?;
        Ok(entries)
    }
}

/// Fixed in-memory source for tests and fixtures.
#[derive(Default)]
pub struct StaticSource {
    entries: Vec<OverlayEntry>,
}

impl StaticSource {
    pub fn new(entries: Vec<OverlayEntry>) -> Self {
        Self { entries }
    }
}

impl CatalogSource for StaticSource {
    fn list(&self) -> Result<Vec<OverlayEntry>> {
        Ok(self.entries.clone())
    }
}

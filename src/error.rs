//! Error types for loradex.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = LdxError> = std::result::Result<T, E>;

/// Error taxonomy for catalog operations.
///
/// Sync-fatal variants (`SourceUnavailable`, `Storage`) surface to the
/// caller with no partial write. `MalformedMetadata` is recovered locally
/// during sync via the name/path heuristic and only appears as an error
/// when a caller parses metadata directly.
#[derive(Debug, Error)]
pub enum LdxError {
    /// Catalog source could not be listed. Fatal to sync.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// Per-overlay metadata could not be parsed.
    #[error("malformed overlay metadata for '{name}': {detail}")]
    MalformedMetadata { name: String, detail: String },

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("missing config: {0}")]
    MissingConfig(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Overlay not present in the local catalog.
    #[error("overlay not found: {0}")]
    NotFound(String),

    /// A worker-pool task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl From<serde_json::Error> for LdxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

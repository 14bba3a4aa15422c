//! Overlay catalog: domain model, source collaborator, persistent store,
//! and the incremental sync engine.

pub mod model;
pub mod source;
pub mod store;
pub mod sync;

pub use model::{
    Category, Confidence, ContentRating, MatchKind, Overlay, OverlayEntry, OverlayInfo, Selection,
    Suggestion, SyncOutcome, SyncState, Validation,
};
pub use source::{CatalogSource, ManifestSource, StaticSource};
pub use store::CatalogStore;
pub use sync::SyncEngine;

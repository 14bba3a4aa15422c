//! Shared helpers for integration tests.

use loradex::catalog::model::OverlayEntry;
use loradex::catalog::source::StaticSource;
use loradex::config::Config;
use loradex::service::OverlayCatalog;
use loradex::storage::Database;
use serde_json::json;

/// Plain entry with no embedded training statistics.
pub fn entry(name: &str) -> OverlayEntry {
    OverlayEntry {
        name: name.to_string(),
        alias: String::new(),
        path: format!("loras/{name}.safetensors"),
        metadata: json!({}),
    }
}

/// Entry carrying a training tag histogram.
pub fn histogram_entry(name: &str, tags: &[(&str, u64)]) -> OverlayEntry {
    let counts: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(tag, count)| ((*tag).to_string(), json!(count)))
        .collect();
    OverlayEntry {
        name: name.to_string(),
        alias: String::new(),
        path: format!("loras/{name}.safetensors"),
        metadata: json!({"ss_tag_frequency": {"training_set": counts}}),
    }
}

/// Service over an in-memory database and a fixed source.
pub fn catalog(entries: Vec<OverlayEntry>) -> OverlayCatalog {
    let db = Database::open_in_memory().expect("open in-memory db");
    OverlayCatalog::new(db, StaticSource::new(entries), Config::default())
}

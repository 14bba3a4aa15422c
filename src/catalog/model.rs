//! Domain model for the overlay catalog.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overlay category derived from training statistics or name heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Anime,
    Realistic,
    Character,
    Style,
    Concept,
    #[default]
    General,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Realistic => "realistic",
            Self::Character => "character",
            Self::Style => "style",
            Self::Concept => "concept",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anime" => Ok(Self::Anime),
            "realistic" => Ok(Self::Realistic),
            "character" => Ok(Self::Character),
            "style" => Ok(Self::Style),
            "concept" => Ok(Self::Concept),
            "general" => Ok(Self::General),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Content-sensitivity rating derived from explicit-tag mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    #[default]
    Safe,
    Suggestive,
    Nsfw,
}

impl ContentRating {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Suggestive => "suggestive",
            Self::Nsfw => "nsfw",
        }
    }
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "suggestive" => Ok(Self::Suggestive),
            "nsfw" => Ok(Self::Nsfw),
            other => Err(format!("unknown content rating: {other}")),
        }
    }
}

/// Raw overlay descriptor as listed by a [`crate::catalog::CatalogSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayEntry {
    pub name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub path: String,
    /// Opaque backend metadata; may carry a training tag histogram.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A catalog row: one overlay with derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overlay {
    pub name: String,
    pub alias: String,
    pub path: String,
    pub filename: String,
    pub weight: f64,
    pub category: Category,
    pub content_rating: ContentRating,
    pub description: String,
    pub trigger_words: Vec<String>,
    /// Raw backend metadata, serialized.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-facing projection of an overlay (search results, info lookups).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayInfo {
    pub name: String,
    pub filename: String,
    pub weight: f64,
    pub trigger_words: Vec<String>,
    pub category: Category,
    pub description: String,
}

impl From<&Overlay> for OverlayInfo {
    fn from(o: &Overlay) -> Self {
        Self {
            name: o.name.clone(),
            filename: o.filename.clone(),
            weight: o.weight,
            trigger_words: o.trigger_words.clone(),
            category: o.category,
            description: o.description.clone(),
        }
    }
}

/// One sync bookkeeping row. Appended per attempt; the latest row is
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub id: i64,
    pub last_sync_check: DateTime<Utc>,
    pub overlay_count: usize,
    pub catalog_hash: String,
    pub cache_version: u32,
    pub sync_duration_ms: u64,
}

/// Result of a sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Overlays written this pass (zero when skipped).
    pub updated: usize,
    /// True when change detection short-circuited the pass.
    pub skipped: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Local rows no longer present upstream. Never deleted automatically.
    pub stale: usize,
}

/// Matching tier that produced a score contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Phrase,
    Concept,
    Partial,
    Semantic,
    Synonym,
}

impl MatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Phrase => "phrase",
            Self::Concept => "concept",
            Self::Partial => "partial",
            Self::Semantic => "semantic",
            Self::Synonym => "synonym",
        }
    }
}

/// Confidence band for a normalized match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Band boundaries: > 0.4 high, > 0.2 medium, else low.
    pub fn from_score(score: f64) -> Self {
        if score > 0.4 {
            Self::High
        } else if score > 0.2 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked overlay recommendation for a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub score: f64,
    pub confidence: Confidence,
    pub reason: String,
    pub category: Category,
    pub key_triggers: Vec<String>,
    pub recommended_weight: f64,
}

/// A caller-chosen overlay with its application weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Outcome of combination validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Validation {
    /// A combination is considered usable as long as nothing warned.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in [
            Category::Anime,
            Category::Realistic,
            Category::Character,
            Category::Style,
            Category::Concept,
            Category::General,
        ] {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(0.41), Confidence::High);
        assert_eq!(Confidence::from_score(0.4), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.21), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.2), Confidence::Low);
        assert_eq!(Confidence::from_score(0.0), Confidence::Low);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }
}

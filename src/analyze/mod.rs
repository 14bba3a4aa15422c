//! Derived-metadata extraction.
//!
//! Classifies each overlay from its training tag histogram when one is
//! embedded, and falls back to name/path heuristics otherwise. Every
//! overlay gets a usable, if lower-confidence, classification.

pub mod histogram;

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::model::{Category, ContentRating, OverlayEntry};
pub use histogram::TagHistogram;

/// How many top-frequency tags participate in category scoring.
const CATEGORY_TAG_WINDOW: usize = 20;

/// Trigger words must appear in more than this many training images.
const TRIGGER_MIN_FREQUENCY: u64 = 5;

const TRIGGER_MIN_LENGTH: usize = 3;
const TRIGGER_LIMIT: usize = 10;

/// Explicit-tag mass ratios for content rating.
const NSFW_RATIO: f64 = 0.10;
const SUGGESTIVE_RATIO: f64 = 0.05;

const ANIME_INDICATORS: &[&str] = &[
    "anime", "manga", "2d", "chibi", "kawaii", "anime style", "cel shading",
];
const REALISTIC_INDICATORS: &[&str] = &[
    "photorealistic", "realistic", "photo", "photography", "real", "portrait",
];
const CHARACTER_INDICATORS: &[&str] = &[
    "1girl", "1boy", "character", "person", "face", "portrait",
];
const STYLE_INDICATORS: &[&str] = &[
    "art style", "painting", "drawing", "sketch", "watercolor", "oil painting",
];
const CONCEPT_INDICATORS: &[&str] = &[
    "pose", "clothing", "outfit", "background", "lighting", "effect",
];

/// Tags too generic to activate an overlay on their own.
const GENERIC_TAGS: &[&str] = &[
    "1girl", "1boy", "solo", "breasts", "looking at viewer", "simple background",
    "white background", "upper body", "portrait", "close-up", "medium shot",
    "long hair", "short hair", "brown hair", "black hair", "blonde hair",
    "blue eyes", "brown eyes", "green eyes", "smile", "open mouth",
];

const NSFW_TAGS: &[&str] = &[
    "nude", "naked", "nipples", "penis", "vagina", "sex", "nsfw", "explicit",
    "pornography", "adult", "mature", "r18",
];

const NAME_NSFW_INDICATORS: &[&str] = &[
    "nsfw", "nude", "adult", "xxx", "porn", "sex", "breast", "hentai",
];

static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[vV]\d+").expect("valid regex"));
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Derived classification for one overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub category: Category,
    pub trigger_words: Vec<String>,
    pub content_rating: ContentRating,
    pub description: String,
    /// True when derived from a training histogram rather than the
    /// name/path heuristic.
    pub from_histogram: bool,
}

/// Stateless classifier over overlay descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataAnalyzer;

impl MetadataAnalyzer {
    pub const fn new() -> Self {
        Self
    }

    /// Classify an overlay. A malformed histogram degrades to the
    /// name/path heuristic rather than failing the entry.
    pub fn analyze(&self, entry: &OverlayEntry) -> Analysis {
        match TagHistogram::parse(&entry.name, &entry.metadata) {
            Ok(Some(hist)) if !hist.is_empty() => self.analyze_histogram(&hist),
            Ok(_) => self.analyze_name_path(&entry.name, &entry.path),
            Err(err) => {
                tracing::warn!("{err}; using name/path heuristics");
                self.analyze_name_path(&entry.name, &entry.path)
            }
        }
    }

    /// Preferred path: classify from the flattened tag histogram.
    pub fn analyze_histogram(&self, hist: &TagHistogram) -> Analysis {
        let top_tags: Vec<&str> = hist
            .by_frequency()
            .into_iter()
            .take(CATEGORY_TAG_WINDOW)
            .map(|(tag, _)| tag)
            .collect();

        let description = if top_tags.is_empty() {
            String::new()
        } else {
            format!(
                "Trained on: {}",
                top_tags.iter().take(5).copied().collect::<Vec<_>>().join(", ")
            )
        };

        Analysis {
            category: categorize(hist, &top_tags),
            trigger_words: extract_triggers(hist),
            content_rating: rate_content(hist),
            description,
            from_histogram: true,
        }
    }

    /// Fallback path: substring heuristics over name and path.
    pub fn analyze_name_path(&self, name: &str, path: &str) -> Analysis {
        let name_lower = name.to_lowercase();
        let path_lower = path.to_lowercase();
        let haystack = format!("{name_lower} {path_lower}");

        let mut triggers: Vec<String> = Vec::new();
        let category = if contains_any(&haystack, &["anime", "manga", "2d", "cartoon", "cel"]) {
            triggers.extend(["anime style", "manga", "2d"].map(String::from));
            Category::Anime
        } else if contains_any(&haystack, &["real", "photo", "realistic", "portrait"]) {
            triggers.extend(["photorealistic", "realistic", "photo"].map(String::from));
            Category::Realistic
        } else if contains_any(
            &haystack,
            &["character", "person", "girl", "boy", "woman", "man"],
        ) {
            Category::Character
        } else if contains_any(&haystack, &["style", "art", "painting", "draw"]) {
            Category::Style
        } else if contains_any(
            &haystack,
            &["pose", "outfit", "clothing", "background"],
        ) {
            Category::Concept
        } else {
            Category::General
        };

        // Name words minus version markers make passable trigger guesses.
        let cleaned = name.replace(['_', '-'], " ");
        let cleaned = VERSION_TOKEN.replace_all(&cleaned, "");
        let cleaned = DIGITS.replace_all(&cleaned, "");
        triggers.extend(
            cleaned
                .split_whitespace()
                .filter(|word| word.len() > 2)
                .take(3)
                .map(|word| word.to_lowercase()),
        );
        triggers.truncate(5);

        let content_rating = if contains_any(&name_lower, NAME_NSFW_INDICATORS) {
            ContentRating::Nsfw
        } else {
            ContentRating::Safe
        };

        Analysis {
            category,
            trigger_words: triggers,
            content_rating,
            description: format!("Overlay: {name} (inferred from filename)"),
            from_histogram: false,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Score the five indicator buckets against the top tags; highest wins,
/// "general" when nothing scores.
fn categorize(hist: &TagHistogram, top_tags: &[&str]) -> Category {
    let bucket_score = |indicators: &[&str]| -> u32 {
        top_tags
            .iter()
            .filter(|tag| {
                let tag = tag.to_lowercase();
                indicators.iter().any(|ind| tag.contains(ind))
            })
            .count() as u32
    };

    let mut scores = [
        (Category::Anime, bucket_score(ANIME_INDICATORS)),
        (Category::Realistic, bucket_score(REALISTIC_INDICATORS)),
        (Category::Character, bucket_score(CHARACTER_INDICATORS)),
        (Category::Style, bucket_score(STYLE_INDICATORS)),
        (Category::Concept, bucket_score(CONCEPT_INDICATORS)),
    ];

    // Hand-tuned boosts for strong single signals.
    if hist.count("1girl") > 100 {
        scores[2].1 += 2;
    }
    if hist.contains("anime") || hist.contains("manga") {
        scores[0].1 += 3;
    }
    if hist.contains("photorealistic") || hist.contains("realistic") {
        scores[1].1 += 3;
    }

    // first bucket wins ties, in the order declared above
    let mut best = (Category::General, 0);
    for (category, score) in scores {
        if score > best.1 {
            best = (category, score);
        }
    }
    best.0
}

/// High-frequency, non-generic tags make trigger words.
fn extract_triggers(hist: &TagHistogram) -> Vec<String> {
    hist.by_frequency()
        .into_iter()
        .filter(|(tag, freq)| {
            *freq > TRIGGER_MIN_FREQUENCY
                && tag.len() >= TRIGGER_MIN_LENGTH
                && !GENERIC_TAGS.contains(&tag.to_lowercase().as_str())
                && !tag.chars().all(|c| c.is_ascii_digit())
        })
        .take(TRIGGER_LIMIT)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Explicit tag mass as a fraction of total mass decides the rating.
fn rate_content(hist: &TagHistogram) -> ContentRating {
    let total = hist.total();
    if total == 0 {
        return ContentRating::Safe;
    }

    let explicit_mass: u64 = hist
        .iter()
        .filter(|(tag, _)| {
            let tag = tag.to_lowercase();
            NSFW_TAGS.iter().any(|ind| tag.contains(ind))
        })
        .map(|(_, freq)| freq)
        .sum();

    let ratio = explicit_mass as f64 / total as f64;
    if ratio > NSFW_RATIO {
        ContentRating::Nsfw
    } else if ratio > SUGGESTIVE_RATIO {
        ContentRating::Suggestive
    } else {
        ContentRating::Safe
    }
}

//! Prompt-driven overlay suggestions.
//!
//! Assembles each overlay's candidate tags, scores them against the
//! tokenized prompt, and ranks the survivors.

use itertools::Itertools;

use crate::analyze::TagHistogram;
use crate::catalog::model::{Confidence, Overlay, Suggestion};
use crate::search::matching::{self, TagMatches};
use crate::search::tokenizer::QueryTokenizer;

/// Overlays whose raw score does not clear this are dropped outright.
const MIN_RAW_SCORE: f64 = 0.1;

/// Recommended application weights per confidence band.
const WEIGHT_HIGH: f64 = 1.0;
const WEIGHT_MEDIUM: f64 = 0.8;
const WEIGHT_LOW: f64 = 0.6;

const REPORTED_TERMS: usize = 3;

/// Ranks overlays against a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionRanker {
    tokenizer: QueryTokenizer,
}

impl SuggestionRanker {
    pub const fn new() -> Self {
        Self {
            tokenizer: QueryTokenizer::new(),
        }
    }

    /// Score every overlay and return the top `limit` suggestions,
    /// best first. Never fails; an unmatched catalog yields an empty list.
    pub fn suggest(&self, overlays: &[Overlay], prompt: &str, limit: usize) -> Vec<Suggestion> {
        let tokens = self.tokenizer.tokenize(prompt);

        let mut suggestions: Vec<Suggestion> = overlays
            .iter()
            .filter_map(|overlay| {
                let tags = candidate_tags(overlay);
                if tags.is_empty() {
                    return None;
                }
                let matches = matching::match_tags(&tokens, &tags);
                if matches.raw_score <= MIN_RAW_SCORE {
                    return None;
                }
                Some(build_suggestion(overlay, &matches))
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        suggestions.truncate(limit);
        suggestions
    }
}

/// Everything that can activate an overlay: trigger words, histogram tag
/// names, the overlay name itself, and description words.
fn candidate_tags(overlay: &Overlay) -> Vec<String> {
    let mut tags: Vec<String> = overlay.trigger_words.clone();

    if let Ok(Some(hist)) = TagHistogram::parse(&overlay.name, &overlay.metadata) {
        tags.extend(hist.tag_names().map(String::from));
    }

    tags.push(overlay.name.clone());
    tags.extend(
        overlay
            .description
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| word.len() > 2),
    );

    tags.into_iter().unique().collect()
}

fn build_suggestion(overlay: &Overlay, matches: &TagMatches) -> Suggestion {
    let score = matches.normalized_score();
    let confidence = matches.confidence();

    let matched = matches.matching_terms();
    let mut reason = format!("Matches {} key terms", matched.len());
    if !matched.is_empty() {
        reason.push_str(&format!(
            ": {}",
            matched.iter().take(REPORTED_TERMS).join(", ")
        ));
        if matched.len() > REPORTED_TERMS {
            reason.push_str(&format!(" and {} more", matched.len() - REPORTED_TERMS));
        }
    }

    let mut key_triggers: Vec<String> = overlay
        .trigger_words
        .iter()
        .filter(|t| matched.contains(t))
        .take(REPORTED_TERMS)
        .cloned()
        .collect();
    if key_triggers.is_empty() {
        key_triggers = overlay
            .trigger_words
            .iter()
            .take(REPORTED_TERMS)
            .cloned()
            .collect();
    }

    Suggestion {
        name: overlay.name.clone(),
        score,
        confidence,
        reason,
        category: overlay.category,
        key_triggers,
        recommended_weight: match confidence {
            Confidence::High => WEIGHT_HIGH,
            Confidence::Medium => WEIGHT_MEDIUM,
            Confidence::Low => WEIGHT_LOW,
        },
    }
}

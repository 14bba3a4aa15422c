//! Tiered tag matching.
//!
//! Each candidate tag lands in the single strongest applicable tier,
//! checked in priority order. Exact lexical evidence outranks every
//! weaker signal, so a loose synonym can never dilute a genuine hit.

use std::collections::HashSet;

use crate::catalog::model::{Category, Confidence, MatchKind};
use crate::search::tokenizer::{TokenizedPrompt, is_synonym, term_class};

const WEIGHT_EXACT: f64 = 3.0;
const WEIGHT_PHRASE: f64 = 2.5;
const WEIGHT_CONCEPT: f64 = 2.0;
const WEIGHT_PARTIAL: f64 = 1.5;
const WEIGHT_SEMANTIC: f64 = 1.0;
const WEIGHT_SYNONYM: f64 = 0.8;

/// A scored overlay match.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatchResult {
    pub name: String,
    pub category: Category,
    pub match_kind: MatchKind,
    pub matching_terms: Vec<String>,
    /// Normalized score in 0..1.
    pub score: f64,
    pub confidence: Confidence,
}

/// Per-tier tag buckets accumulated while scoring one overlay.
#[derive(Debug, Clone, Default)]
pub struct TagMatches {
    pub exact: Vec<String>,
    pub phrase: Vec<String>,
    pub concept: Vec<String>,
    pub partial: Vec<String>,
    pub semantic: Vec<String>,
    pub synonym: Vec<String>,
    pub raw_score: f64,
    tag_count: usize,
}

impl TagMatches {
    /// Normalize against the maximum possible score (every tag exact).
    pub fn normalized_score(&self) -> f64 {
        if self.tag_count == 0 {
            return 0.0;
        }
        self.raw_score / (WEIGHT_EXACT * self.tag_count as f64)
    }

    pub fn confidence(&self) -> Confidence {
        Confidence::from_score(self.normalized_score())
    }

    /// The strongest tier that matched anything.
    pub fn primary_kind(&self) -> MatchKind {
        if !self.exact.is_empty() {
            MatchKind::Exact
        } else if !self.phrase.is_empty() {
            MatchKind::Phrase
        } else if !self.concept.is_empty() {
            MatchKind::Concept
        } else if !self.partial.is_empty() {
            MatchKind::Partial
        } else if !self.semantic.is_empty() {
            MatchKind::Semantic
        } else {
            MatchKind::Synonym
        }
    }

    /// Terms from the strong tiers, the ones worth reporting.
    pub fn matching_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        terms.extend(self.exact.iter().cloned());
        terms.extend(self.phrase.iter().cloned());
        terms.extend(self.concept.iter().cloned());
        terms
    }

    /// Which tier a single tag landed in, if any.
    pub fn kind_of(&self, tag: &str) -> Option<MatchKind> {
        let norm = normalize_tag(tag);
        [
            (&self.exact, MatchKind::Exact),
            (&self.phrase, MatchKind::Phrase),
            (&self.concept, MatchKind::Concept),
            (&self.partial, MatchKind::Partial),
            (&self.semantic, MatchKind::Semantic),
            (&self.synonym, MatchKind::Synonym),
        ]
        .into_iter()
        .find(|(bucket, _)| bucket.iter().any(|t| normalize_tag(t) == norm))
        .map(|(_, kind)| kind)
    }

    pub fn into_result(self, name: &str, category: Category) -> MatchResult {
        let score = self.normalized_score();
        MatchResult {
            name: name.to_string(),
            category,
            match_kind: self.primary_kind(),
            matching_terms: self.matching_terms(),
            score,
            confidence: self.confidence(),
        }
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace(['_', '-'], " ")
}

/// Score every candidate tag against a tokenized prompt. First matching
/// tier wins per tag.
pub fn match_tags(tokens: &TokenizedPrompt, tags: &[String]) -> TagMatches {
    let mut matches = TagMatches {
        tag_count: tags.len(),
        ..TagMatches::default()
    };

    for tag in tags {
        let tag_lower = normalize_tag(tag);
        let tag_words: HashSet<&str> = tag_lower.split(' ').filter(|w| !w.is_empty()).collect();

        if tokens.word_set.contains(&tag_lower) {
            matches.exact.push(tag.clone());
            matches.raw_score += WEIGHT_EXACT;
        } else if tokens.phrases.contains(&tag_lower) {
            matches.phrase.push(tag.clone());
            matches.raw_score += WEIGHT_PHRASE;
        } else if tokens.key_concepts.contains(&tag_lower) {
            matches.concept.push(tag.clone());
            matches.raw_score += WEIGHT_CONCEPT;
        } else if tag_words.iter().any(|w| tokens.word_set.contains(*w)) {
            let overlap = tag_words
                .iter()
                .filter(|w| tokens.word_set.contains(**w))
                .count() as f64
                / tag_words.len() as f64;
            matches.partial.push(tag.clone());
            matches.raw_score += WEIGHT_PARTIAL * overlap;
        } else if term_class(&tag_lower).is_some_and(|class| tokens.has_class(class)) {
            matches.semantic.push(tag.clone());
            matches.raw_score += WEIGHT_SEMANTIC;
        } else if is_synonym(&tag_lower, &tokens.word_set) {
            matches.synonym.push(tag.clone());
            matches.raw_score += WEIGHT_SYNONYM;
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenizer::QueryTokenizer;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_exact_beats_synonym_tier() {
        let tokens = QueryTokenizer::new().tokenize("anime girl portrait");
        let matches = match_tags(&tokens, &tags(&["anime", "manga"]));

        assert_eq!(matches.kind_of("anime"), Some(MatchKind::Exact));
        // "manga" lands in the semantic tier (shared style vocabulary)
        // before the synonym tier is consulted
        assert_eq!(matches.kind_of("manga"), Some(MatchKind::Semantic));
    }

    #[test]
    fn test_synonym_tier_reached_when_no_stronger_signal() {
        let tokens = QueryTokenizer::new().tokenize("beautiful sunset");
        let matches = match_tags(&tokens, &tags(&["gorgeous"]));
        assert_eq!(matches.kind_of("gorgeous"), Some(MatchKind::Synonym));
        assert!((matches.raw_score - WEIGHT_SYNONYM).abs() < 1e-9);
    }

    #[test]
    fn test_phrase_tier() {
        let tokens = QueryTokenizer::new().tokenize("soft oil painting texture");
        let matches = match_tags(&tokens, &tags(&["oil painting"]));
        assert_eq!(matches.kind_of("oil painting"), Some(MatchKind::Phrase));
    }

    #[test]
    fn test_partial_overlap_fraction() {
        let tokens = QueryTokenizer::new().tokenize("city lights");
        let matches = match_tags(&tokens, &tags(&["neon_city"]));
        assert_eq!(matches.kind_of("neon_city"), Some(MatchKind::Partial));
        // one of two tag words overlaps
        assert!((matches.raw_score - WEIGHT_PARTIAL * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_underscore_tags_normalize_before_matching() {
        let tokens = QueryTokenizer::new().tokenize("cel shading test");
        let matches = match_tags(&tokens, &tags(&["cel_shading"]));
        assert_eq!(matches.kind_of("cel_shading"), Some(MatchKind::Phrase));
    }

    #[test]
    fn test_score_monotonicity_exact_vs_synonym() {
        let exact_tokens = QueryTokenizer::new().tokenize("pretty fine natural");
        let exact = match_tags(&exact_tokens, &tags(&["pretty", "fine", "natural"]));

        // same three tags matched only through synonyms
        let syn_tokens = QueryTokenizer::new().tokenize("beautiful detailed realistic");
        let synonyms = match_tags(&syn_tokens, &tags(&["pretty", "fine", "natural"]));

        assert!(exact.normalized_score() >= synonyms.normalized_score());
        assert!((exact.normalized_score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_scores_zero() {
        let tokens = QueryTokenizer::new().tokenize("quiet library");
        let matches = match_tags(&tokens, &tags(&["underwater", "volcano"]));
        assert_eq!(matches.raw_score, 0.0);
        assert_eq!(matches.normalized_score(), 0.0);
        assert_eq!(matches.confidence(), Confidence::Low);
    }

    #[test]
    fn test_empty_tags_normalize_to_zero() {
        let tokens = QueryTokenizer::new().tokenize("anything");
        let matches = match_tags(&tokens, &[]);
        assert_eq!(matches.normalized_score(), 0.0);
    }

    #[test]
    fn test_into_result_reports_primary_kind() {
        let tokens = QueryTokenizer::new().tokenize("cyberpunk city at night");
        let matches = match_tags(&tokens, &tags(&["cyberpunk", "neon", "city"]));
        let result = matches.into_result("neon_city", Category::Concept);
        assert_eq!(result.match_kind, MatchKind::Exact);
        assert!(result.matching_terms.contains(&"cyberpunk".to_string()));
        assert!(result.score > 0.4);
        assert_eq!(result.confidence, Confidence::High);
    }
}

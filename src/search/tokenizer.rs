//! Prompt tokenization.
//!
//! Normalizes a prompt into words, contiguous n-gram phrases, and a
//! filtered key-concept list, and buckets recognized terms into fixed
//! semantic classes used by the semantic matching tier.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Photography and rendering technique vocabulary.
pub const TECHNICAL_TERMS: &[&str] = &[
    "bokeh", "dof", "depth of field", "macro", "telephoto", "wide-angle",
    "portrait", "landscape", "close-up", "panoramic", "fisheye", "tilt-shift",
    "long exposure", "hdr", "bracketing", "focus stacking", "panning",
];

/// Art and style vocabulary.
pub const STYLE_TERMS: &[&str] = &[
    "anime", "realistic", "cartoon", "photorealistic", "artistic", "painted",
    "watercolor", "oil painting", "acrylic", "digital art", "concept art",
    "impressionist", "abstract", "minimalist", "surreal", "pop art",
    "sketch", "drawing", "illustration", "manga", "comic book",
];

/// Subject vocabulary.
pub const SUBJECT_TERMS: &[&str] = &[
    "woman", "man", "girl", "boy", "person", "character", "people",
    "animal", "cat", "dog", "bird", "horse", "dragon", "creature",
    "car", "vehicle", "motorcycle", "plane", "ship", "robot", "mecha",
    "building", "house", "castle", "city", "landscape", "forest", "mountain",
    "flower", "tree", "plant", "nature", "ocean", "sky", "cloud",
];

/// Environment and setting vocabulary.
pub const ENVIRONMENT_TERMS: &[&str] = &[
    "indoor", "outdoor", "studio", "natural light", "artificial light",
    "sunset", "sunrise", "night", "day", "evening", "morning",
    "cyberpunk", "steampunk", "fantasy", "sci-fi", "medieval",
    "modern", "futuristic", "vintage", "retro", "contemporary",
];

/// Bidirectional synonym table for the weakest matching tier.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("beautiful", &["pretty", "gorgeous", "stunning", "attractive", "lovely"]),
    ("detailed", &["intricate", "complex", "elaborate", "fine", "precise"]),
    ("realistic", &["photorealistic", "lifelike", "natural", "authentic"]),
    ("anime", &["manga", "japanese animation", "cartoon", "animated"]),
    ("portrait", &["headshot", "face", "bust", "profile"]),
    ("landscape", &["scenery", "vista", "panorama", "countryside"]),
];

const STOPWORDS: &[&str] = &[
    "with", "and", "the", "a", "an", "in", "on", "at", "by", "for", "of", "to",
];

const MIN_CONCEPT_WORD_LEN: usize = 4;
const MAX_CONCEPT_PHRASE_WORDS: usize = 3;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\(\)\[\]\{\}]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Semantic class of a recognized term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermClass {
    Technical,
    Style,
    Subject,
    Environment,
}

/// Look up which fixed vocabulary a term belongs to, if any.
pub fn term_class(term: &str) -> Option<TermClass> {
    if TECHNICAL_TERMS.contains(&term) {
        Some(TermClass::Technical)
    } else if STYLE_TERMS.contains(&term) {
        Some(TermClass::Style)
    } else if SUBJECT_TERMS.contains(&term) {
        Some(TermClass::Subject)
    } else if ENVIRONMENT_TERMS.contains(&term) {
        Some(TermClass::Environment)
    } else {
        None
    }
}

/// A tokenized prompt ready for matching.
#[derive(Debug, Clone, Default)]
pub struct TokenizedPrompt {
    pub original: String,
    pub cleaned: String,
    pub words: Vec<String>,
    pub word_set: HashSet<String>,
    pub phrases: HashSet<String>,
    pub key_concepts: HashSet<String>,
    pub technical_terms: Vec<String>,
    pub style_terms: Vec<String>,
    pub subject_terms: Vec<String>,
    pub environment_terms: Vec<String>,
}

impl TokenizedPrompt {
    /// True when the prompt surfaced any term of the given class.
    pub fn has_class(&self, class: TermClass) -> bool {
        match class {
            TermClass::Technical => !self.technical_terms.is_empty(),
            TermClass::Style => !self.style_terms.is_empty(),
            TermClass::Subject => !self.subject_terms.is_empty(),
            TermClass::Environment => !self.environment_terms.is_empty(),
        }
    }
}

/// Normalizes prompts into the token structure the matcher consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTokenizer;

impl QueryTokenizer {
    pub const fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, prompt: &str) -> TokenizedPrompt {
        let lowered = prompt.to_lowercase();
        let cleaned = PUNCTUATION.replace_all(&lowered, " ");
        let cleaned = WHITESPACE.replace_all(&cleaned, " ").trim().to_string();

        let words: Vec<String> = cleaned.split(' ').filter(|w| !w.is_empty()).map(String::from).collect();
        let word_set: HashSet<String> = words.iter().cloned().collect();

        // Contiguous n-grams, n in [2, 4]
        let mut phrases = HashSet::new();
        for len in 2..=4usize.min(words.len()) {
            for window in words.windows(len) {
                phrases.insert(window.join(" "));
            }
        }

        let bucket = |terms: &[&str]| -> Vec<String> {
            let mut found: Vec<String> = words
                .iter()
                .filter(|w| terms.contains(&w.as_str()))
                .cloned()
                .collect();
            // Multi-word vocabulary entries match as substrings.
            found.extend(
                terms
                    .iter()
                    .filter(|t| t.contains(' ') && cleaned.contains(*t))
                    .map(|t| (*t).to_string()),
            );
            found
        };

        let mut key_concepts: HashSet<String> = words
            .iter()
            .filter(|w| w.len() >= MIN_CONCEPT_WORD_LEN && !STOPWORDS.contains(&w.as_str()))
            .cloned()
            .collect();
        key_concepts.extend(
            phrases
                .iter()
                .filter(|p| p.split(' ').count() <= MAX_CONCEPT_PHRASE_WORDS)
                .cloned(),
        );

        TokenizedPrompt {
            original: prompt.to_string(),
            cleaned: cleaned.clone(),
            technical_terms: bucket(TECHNICAL_TERMS),
            style_terms: bucket(STYLE_TERMS),
            subject_terms: bucket(SUBJECT_TERMS),
            environment_terms: bucket(ENVIRONMENT_TERMS),
            words,
            word_set,
            phrases,
            key_concepts,
        }
    }
}

/// Bidirectional synonym check: the tag is a synonym of a prompt word, or
/// a prompt word is a synonym of the tag.
pub fn is_synonym(tag: &str, word_set: &HashSet<String>) -> bool {
    for (key, synonyms) in SYNONYMS {
        if word_set.contains(*key) && synonyms.contains(&tag) {
            return true;
        }
        if tag == *key && synonyms.iter().any(|s| word_set.contains(*s)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_normalized_and_lowercased() {
        let tokens = QueryTokenizer::new().tokenize("Anime girl, (city) [night]");
        assert_eq!(tokens.cleaned, "anime girl city night");
        assert_eq!(tokens.words, vec!["anime", "girl", "city", "night"]);
    }

    #[test]
    fn test_phrases_are_2_to_4_grams() {
        let tokens = QueryTokenizer::new().tokenize("a b c d e");
        assert!(tokens.phrases.contains("a b"));
        assert!(tokens.phrases.contains("b c d"));
        assert!(tokens.phrases.contains("a b c d"));
        assert!(!tokens.phrases.contains("a b c d e"));
        assert!(!tokens.phrases.contains("a"));
    }

    #[test]
    fn test_short_prompt_has_no_phrases() {
        let tokens = QueryTokenizer::new().tokenize("anime");
        assert!(tokens.phrases.is_empty());
    }

    #[test]
    fn test_key_concepts_filter_stopwords_and_short_words() {
        let tokens = QueryTokenizer::new().tokenize("city at night with rain");
        assert!(tokens.key_concepts.contains("city"));
        assert!(tokens.key_concepts.contains("night"));
        assert!(tokens.key_concepts.contains("rain"));
        assert!(!tokens.key_concepts.contains("with"));
        assert!(!tokens.key_concepts.contains("at"));
        // phrases up to three words are concepts too
        assert!(tokens.key_concepts.contains("city at night"));
    }

    #[test]
    fn test_term_buckets_single_and_multi_word() {
        let tokens = QueryTokenizer::new().tokenize("anime portrait with depth of field");
        assert!(tokens.style_terms.contains(&"anime".to_string()));
        assert!(tokens.technical_terms.contains(&"portrait".to_string()));
        assert!(tokens.technical_terms.contains(&"depth of field".to_string()));
        assert!(tokens.has_class(TermClass::Style));
        assert!(!tokens.has_class(TermClass::Environment));
    }

    #[test]
    fn test_synonym_lookup_is_bidirectional() {
        // forward: prompt holds the key, tag is one of its synonyms
        let tokens = QueryTokenizer::new().tokenize("beautiful anime scene");
        assert!(is_synonym("gorgeous", &tokens.word_set));

        // reverse: prompt holds a synonym, tag is the key
        let tokens = QueryTokenizer::new().tokenize("manga panel");
        assert!(is_synonym("anime", &tokens.word_set));
        assert!(!is_synonym("cyberpunk", &tokens.word_set));
    }
}

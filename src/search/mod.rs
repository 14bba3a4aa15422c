//! Prompt search and recommendation.
//!
//! Tokenizes free-text prompts, scores overlay tags through a tiered
//! matching hierarchy, caches query results, and ranks suggestions.

pub mod cache;
pub mod matching;
pub mod suggest;
pub mod tokenizer;

pub use cache::SearchCache;
pub use matching::{MatchResult, TagMatches};
pub use suggest::SuggestionRanker;
pub use tokenizer::{QueryTokenizer, TokenizedPrompt};

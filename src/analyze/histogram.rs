//! Training tag-frequency histogram.
//!
//! Backends embed per-training-run tag counts under `ss_tag_frequency`,
//! either as a JSON object or as a JSON-encoded string, grouped by dataset
//! name. Absence is normal (many overlays ship without training stats);
//! a present-but-unparsable histogram is malformed metadata.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{LdxError, Result};

const TAG_FREQUENCY_KEY: &str = "ss_tag_frequency";

/// Flattened tag -> count map across all datasets of a training run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagHistogram {
    tags: BTreeMap<String, u64>,
}

impl TagHistogram {
    /// Extract the histogram from raw backend metadata.
    ///
    /// Returns `Ok(None)` when no histogram is embedded, and
    /// [`LdxError::MalformedMetadata`] when one is embedded but cannot be
    /// decoded.
    pub fn parse(name: &str, metadata: &Value) -> Result<Option<Self>> {
        let Some(raw) = metadata.get(TAG_FREQUENCY_KEY) else {
            return Ok(None);
        };

        let tree: Value = match raw {
            Value::String(encoded) => {
                serde_json::from_str(encoded).map_err(|err| LdxError::MalformedMetadata {
                    name: name.to_string(),
                    detail: format!("tag frequency is not valid JSON: {err}"),
                })?
            }
            other => other.clone(),
        };

        let Value::Object(datasets) = tree else {
            return Err(LdxError::MalformedMetadata {
                name: name.to_string(),
                detail: "tag frequency is not an object".to_string(),
            });
        };

        let mut tags: BTreeMap<String, u64> = BTreeMap::new();
        for dataset in datasets.values() {
            let Value::Object(counts) = dataset else {
                // Datasets occasionally carry scalar annotations; skip them.
                continue;
            };
            for (tag, count) in counts {
                if let Some(n) = count.as_u64() {
                    *tags.entry(tag.clone()).or_default() += n;
                } else if let Some(f) = count.as_f64() {
                    *tags.entry(tag.clone()).or_default() += f as u64;
                }
            }
        }

        Ok(Some(Self { tags }))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn count(&self, tag: &str) -> u64 {
        self.tags.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Total tag mass across the histogram.
    pub fn total(&self) -> u64 {
        self.tags.values().sum()
    }

    /// Tags ordered by frequency descending, ties alphabetical.
    pub fn by_frequency(&self) -> Vec<(&str, u64)> {
        let mut pairs: Vec<(&str, u64)> = self
            .tags
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.tags.iter().map(|(tag, count)| (tag.as_str(), *count))
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, u64)]) -> Self {
        Self {
            tags: pairs
                .iter()
                .map(|(tag, count)| ((*tag).to_string(), *count))
                .collect(),
        }
    }
}

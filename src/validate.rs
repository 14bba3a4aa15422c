//! Combination validation and weight presets.
//!
//! Checks a chosen overlay set for weight and category conflicts, and
//! applies named weight presets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::model::{Category, Selection, Validation};
use crate::catalog::store::CatalogStore;
use crate::error::Result;
use crate::storage::Database;

/// Combined weight above this tends to produce artifacts.
const MAX_TOTAL_WEIGHT: f64 = 3.0;

/// Combined weight below this rarely has a visible effect.
const MIN_EFFECTIVE_WEIGHT: f64 = 1.5;

const MAX_STYLE_OVERLAYS: usize = 2;
const MAX_CHARACTER_OVERLAYS: usize = 1;

/// Named weight multiplier presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPreset {
    Subtle,
    #[default]
    Balanced,
    Strong,
    Extreme,
}

impl WeightPreset {
    /// Apply the preset to one weight.
    pub fn apply(self, weight: f64) -> f64 {
        match self {
            Self::Subtle => weight * 0.7,
            Self::Balanced => weight,
            Self::Strong => (weight * 1.3).min(1.5),
            Self::Extreme => (weight * 1.5).min(2.0),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Balanced => "balanced",
            Self::Strong => "strong",
            Self::Extreme => "extreme",
        }
    }
}

impl FromStr for WeightPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subtle" => Ok(Self::Subtle),
            "balanced" => Ok(Self::Balanced),
            "strong" => Ok(Self::Strong),
            "extreme" => Ok(Self::Extreme),
            other => Err(format!("unknown weight preset: {other}")),
        }
    }
}

/// Validates overlay combinations against the catalog.
pub struct CombinationValidator<'db> {
    store: CatalogStore<'db>,
}

impl<'db> CombinationValidator<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            store: CatalogStore::new(db),
        }
    }

    /// Check a selection for weight and category conflicts. Unknown names
    /// simply contribute no category signal.
    pub fn validate(&self, selection: &[Selection]) -> Result<Validation> {
        let mut validation = Validation::default();

        let total_weight: f64 = selection.iter().map(|s| s.weight).sum();
        if total_weight > MAX_TOTAL_WEIGHT {
            validation.warnings.push(format!(
                "Total overlay weight ({total_weight:.1}) exceeds {MAX_TOTAL_WEIGHT:.1}, may cause artifacts"
            ));
        }

        let mut style_names = Vec::new();
        let mut character_names = Vec::new();
        for sel in selection {
            if let Some(info) = self.store.info(&sel.name)? {
                match info.category {
                    Category::Style => style_names.push(info.name),
                    Category::Character => character_names.push(info.name),
                    _ => {}
                }
            }
        }

        if style_names.len() > MAX_STYLE_OVERLAYS {
            validation.warnings.push(format!(
                "Multiple style overlays selected: {}. May cause conflicts.",
                style_names.join(", ")
            ));
        }
        if character_names.len() > MAX_CHARACTER_OVERLAYS {
            validation.warnings.push(format!(
                "Multiple character overlays selected: {}. Consider using only one.",
                character_names.join(", ")
            ));
        }

        if total_weight < MIN_EFFECTIVE_WEIGHT {
            validation
                .recommendations
                .push("Consider increasing overlay weights for a stronger effect".to_string());
        }
        if style_names.is_empty() {
            validation
                .recommendations
                .push("Consider adding a style overlay for better aesthetic control".to_string());
        }

        Ok(validation)
    }
}

/// Apply a preset to every selection, returning the adjusted set.
pub fn optimize_weights(selection: &[Selection], preset: WeightPreset) -> Vec<Selection> {
    selection
        .iter()
        .map(|sel| Selection {
            name: sel.name.clone(),
            weight: preset.apply(sel.weight),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::ContentRating;
    use crate::catalog::store::UpsertOverlay;

    fn seed(db: &Database, name: &str, category: Category) {
        CatalogStore::new(db)
            .upsert(&UpsertOverlay {
                name: name.to_string(),
                alias: String::new(),
                path: format!("loras/{name}.safetensors"),
                category,
                content_rating: ContentRating::Safe,
                description: String::new(),
                trigger_words: vec![],
                metadata: serde_json::json!({}),
            })
            .unwrap();
    }

    fn pick(name: &str, weight: f64) -> Selection {
        Selection {
            name: name.to_string(),
            weight,
        }
    }

    #[test]
    fn test_overweight_and_style_conflict_warn_together() {
        let db = Database::open_in_memory().unwrap();
        for name in ["s1", "s2", "s3"] {
            seed(&db, name, Category::Style);
        }

        let validation = CombinationValidator::new(&db)
            .validate(&[pick("s1", 1.5), pick("s2", 1.0), pick("s3", 1.0)])
            .unwrap();

        assert_eq!(validation.warnings.len(), 2);
        assert!(validation.warnings[0].contains("3.5"));
        assert!(validation.warnings[1].contains("Multiple style overlays"));
        assert!(!validation.is_clean());
    }

    #[test]
    fn test_character_conflict_warns() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "c1", Category::Character);
        seed(&db, "c2", Category::Character);

        let validation = CombinationValidator::new(&db)
            .validate(&[pick("c1", 1.0), pick("c2", 1.0)])
            .unwrap();

        assert!(validation
            .warnings
            .iter()
            .any(|w| w.contains("Multiple character overlays")));
    }

    #[test]
    fn test_recommendations_for_weak_styleless_selection() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "g1", Category::General);

        let validation = CombinationValidator::new(&db)
            .validate(&[pick("g1", 0.5)])
            .unwrap();

        assert!(validation.is_clean());
        assert_eq!(validation.recommendations.len(), 2);
        assert!(validation.recommendations[0].contains("increasing overlay weights"));
        assert!(validation.recommendations[1].contains("adding a style overlay"));
    }

    #[test]
    fn test_two_styles_under_the_limit_is_clean() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "s1", Category::Style);
        seed(&db, "s2", Category::Style);

        let validation = CombinationValidator::new(&db)
            .validate(&[pick("s1", 1.0), pick("s2", 0.8)])
            .unwrap();
        assert!(validation.is_clean());
    }

    #[test]
    fn test_unknown_names_only_affect_weight_checks() {
        let db = Database::open_in_memory().unwrap();
        let validation = CombinationValidator::new(&db)
            .validate(&[pick("ghost", 4.0)])
            .unwrap();
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].contains("exceeds"));
    }

    #[test]
    fn test_weight_presets() {
        assert!((WeightPreset::Subtle.apply(1.0) - 0.7).abs() < 1e-9);
        assert!((WeightPreset::Balanced.apply(1.0) - 1.0).abs() < 1e-9);
        assert!((WeightPreset::Strong.apply(1.0) - 1.3).abs() < 1e-9);
        // caps
        assert!((WeightPreset::Strong.apply(1.4) - 1.5).abs() < 1e-9);
        assert!((WeightPreset::Extreme.apply(1.0) - 1.5).abs() < 1e-9);
        assert!((WeightPreset::Extreme.apply(1.6) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_optimize_weights_maps_selection() {
        let adjusted = optimize_weights(
            &[pick("a", 1.0), pick("b", 0.5)],
            WeightPreset::Subtle,
        );
        assert!((adjusted[0].weight - 0.7).abs() < 1e-9);
        assert!((adjusted[1].weight - 0.35).abs() < 1e-9);
    }
}

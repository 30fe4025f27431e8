//! Feature Schema Module
//!
//! Typed row definitions for every pipeline stage, the ordered model feature
//! schema, and the dense entity index used as the predictor's embedding key.
//!
//! # Example
//!
//! ```
//! use excess_return_pipeline::schema::{FeatureCategory, FeatureSchema};
//!
//! let schema = FeatureSchema::standard();
//! assert_eq!(schema.total_count(), 24);
//!
//! let ma = schema.get_feature("ma_5").unwrap();
//! assert_eq!(ma.category, FeatureCategory::Trend);
//! ```

mod feature_def;
mod rows;

pub use feature_def::{FeatureCategory, FeatureDef, FeatureSchema, FEATURE_COUNT, FEATURE_NAMES};
pub use rows::{FeatureRow, Indicators, LabeledRow, ObservationRow};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Dense 0-based index over sorted unique entity ids.
///
/// The index is built once from the final labeled panel so that the same
/// entity maps to the same embedding slot in every partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityIndex {
    map: BTreeMap<String, usize>,
}

impl EntityIndex {
    /// Build from any iterator of entity ids (duplicates allowed).
    pub fn from_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<&str> = ids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let map = sorted
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), i))
            .collect();
        Self { map }
    }

    /// Index of an entity, if known.
    pub fn get(&self, entity_id: &str) -> Option<usize> {
        self.map.get(entity_id).copied()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate `(entity_id, index)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

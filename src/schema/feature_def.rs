//! Feature definitions and schema types.
//!
//! This module defines the metadata for the model feature vector:
//! - `FeatureCategory`: Enum of feature types (Raw, Trend, Momentum, ...)
//! - `FeatureDef`: Metadata for a single feature
//! - `FeatureSchema`: Ordered collection of feature definitions
//!
//! The order of [`FEATURE_NAMES`] is the column order of every feature matrix
//! the crate produces (scaler input, sequence windows, NumPy exports).

use serde::{Deserialize, Serialize};

/// Number of model features per row.
pub const FEATURE_COUNT: usize = 24;

/// Model feature names in column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "open",
    "high",
    "low",
    "close",
    "high_52w",
    "low_52w",
    "base_price",
    "current_price",
    "volume",
    "rank",
    "acc_volume",
    "listed_shares",
    "ma_5",
    "ma_10",
    "rsi_14",
    "macd",
    "macd_signal",
    "ret_1d",
    "ret_5d",
    "vol_10d",
    "close_ma10_dev",
    "vol_z_20",
    "xret_1d",
    "xret_5d",
];

/// Feature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    /// Raw observation fields (prices, volumes, ranks, share counts)
    Raw,

    /// Moving averages and MACD
    Trend,

    /// RSI and deviation from the moving average
    Momentum,

    /// Log returns
    Return,

    /// Rolling return volatility
    Volatility,

    /// Volume-derived statistics
    Volume,

    /// Same-date market-relative quantities (cross-sectional)
    MarketRelative,
}

impl FeatureCategory {
    /// Get the display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureCategory::Raw => "Raw",
            FeatureCategory::Trend => "Trend",
            FeatureCategory::Momentum => "Momentum",
            FeatureCategory::Return => "Return",
            FeatureCategory::Volatility => "Volatility",
            FeatureCategory::Volume => "Volume",
            FeatureCategory::MarketRelative => "Market-Relative",
        }
    }

    /// Whether features of this category depend on other entities' data.
    pub fn is_cross_sectional(&self) -> bool {
        matches!(self, FeatureCategory::MarketRelative)
    }
}

/// Definition of a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Unique feature name (e.g., "ma_5", "xret_1d")
    pub name: String,

    /// Index in the feature vector
    pub index: usize,

    /// Feature category
    pub category: FeatureCategory,

    /// Human-readable description
    pub description: String,
}

impl FeatureDef {
    /// Create a new feature definition.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        category: FeatureCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            category,
            description: description.into(),
        }
    }
}

/// Ordered feature schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema version
    pub version: String,

    /// All feature definitions, in column order
    features: Vec<FeatureDef>,
}

impl FeatureSchema {
    /// The standard 24-feature schema.
    pub fn standard() -> Self {
        use FeatureCategory::*;

        let describe = |name: &str| -> (FeatureCategory, &'static str) {
            match name {
                "open" | "high" | "low" | "close" => (Raw, "Daily OHLC price"),
                "high_52w" | "low_52w" => (Raw, "52-week price extreme"),
                "base_price" => (Raw, "Reference base price"),
                "current_price" => (Raw, "Current quoted price"),
                "volume" => (Raw, "Traded volume"),
                "rank" => (Raw, "Activity rank"),
                "acc_volume" => (Raw, "Accumulated traded volume"),
                "listed_shares" => (Raw, "Listed share count"),
                "ma_5" | "ma_10" => (Trend, "Rolling mean of close"),
                "macd" => (Trend, "EMA-12 minus EMA-26 of close"),
                "macd_signal" => (Trend, "EMA-9 of MACD"),
                "rsi_14" => (Momentum, "14-period relative strength index"),
                "close_ma10_dev" => (Momentum, "Close relative to its 10-period mean"),
                "ret_1d" | "ret_5d" => (Return, "Lagged log return"),
                "vol_10d" => (Volatility, "Rolling std of 1-period log return"),
                "vol_z_20" => (Volume, "20-period volume z-score"),
                _ => (MarketRelative, "Log return minus same-date market mean"),
            }
        };

        let features = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let (category, description) = describe(*name);
                FeatureDef::new(*name, index, category, description)
            })
            .collect();

        Self {
            version: super::SCHEMA_VERSION.to_string(),
            features,
        }
    }

    /// Total number of features.
    pub fn total_count(&self) -> usize {
        self.features.len()
    }

    /// All feature definitions in column order.
    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    /// Look up a feature by name.
    pub fn get_feature(&self, name: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Feature names in column order.
    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Features belonging to a category.
    pub fn by_category(&self, category: FeatureCategory) -> Vec<&FeatureDef> {
        self.features
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

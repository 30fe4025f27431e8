//! Panel preprocessing between indicator computation and sequence building.
//!
//! - **Cross-section**: same-date market means and excess quantities
//!   - `target_excess_log = target_log - mean_d(target_log)`
//!   - `xret_1d`, `xret_5d` from `ret_1d`, `ret_5d`
//!
//! - **Filters**: liquidity / price thresholds, incomplete-row removal
//!
//! - **Normalization**: train-only standardisation
//!   - Feature scaler (24 columns)
//!   - Target scaler (`target_excess_log`)
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::preprocessing::{
//!     CrossSectionalNormalizer, FilterConfig, LiquidityFilter, TargetScaler,
//! };
//!
//! let rows = CrossSectionalNormalizer.excess_targets(rows);
//! let (rows, dropped) = LiquidityFilter::new(FilterConfig::default()).apply(rows);
//! let target_scaler = TargetScaler::fit(&train_targets)?;
//! ```

pub mod cross_section;
pub mod filter;
pub mod normalization;

// Re-export commonly used types for convenience
pub use cross_section::{CrossSectionalNormalizer, MarketMeans};
pub use filter::{drop_incomplete, FilterConfig, LiquidityFilter};
pub use normalization::{FeatureScaler, FittedScalers, StandardScaler, TargetScaler};

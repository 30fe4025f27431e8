//! Target and label construction for horizon-H excess-return forecasting.
//!
//! # Overview
//!
//! Labeling converts the indicator panel into supervised targets:
//! a continuous regression target (log excess return over H periods) and an
//! auxiliary top/bottom classification label with a weight that masks the
//! ambiguous middle band.
//!
//! # Stages
//!
//! ```text
//! FeatureRow ──▶ horizon_targets ──▶ excess (market mean, see preprocessing)
//!                                          │
//!                   bound_excess  ◀────────┘   discard |x| >= outlier_abs_max,
//!                        │                      then clip to ±clip_abs
//!                        ▼
//!     (excess returns, liquidity filter, incomplete-row drop)
//!                        │
//!                        ▼
//!                 assign_classes  per-date percentile → Top / Bottom / none
//! ```
//!
//! Discard happens before clip so that extreme values never land on the clip
//! boundary.
//!
//! # Mathematical Background
//!
//! ```text
//! target_log(t)        = ln(close[t+H] / close[t])
//! target_excess_log(t) = target_log(t) - mean_{entities on t}(target_log)
//! pct(t, e)            = rank_t(target_excess_log) / n_t
//! ```
//!
//! # Example
//!
//! ```
//! use excess_return_pipeline::labeling::{ClassLabel, LabelConfig, TieBreak};
//!
//! let config = LabelConfig::default();
//! assert_eq!(config.horizon, 5);
//! assert_eq!(config.tie_break, TieBreak::Average);
//! assert!(config.validate().is_ok());
//!
//! assert_eq!(ClassLabel::from_int(1), Some(ClassLabel::Top));
//! ```

pub mod forward_return;
pub mod percentile;

pub use forward_return::horizon_targets;
pub use percentile::{assign_classes, classify, percentile_ranks};

use crate::schema::LabeledRow;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// Classification bucket of a row's excess target within its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    /// Bottom `bottom_frac` of the cross-section
    Bottom = 0,

    /// Top `top_frac` of the cross-section
    Top = 1,
}

impl ClassLabel {
    /// 0 (Bottom) or 1 (Top).
    #[inline]
    pub fn as_int(&self) -> u8 {
        *self as u8
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.as_int() as f64
    }

    pub fn from_int(value: u8) -> Option<Self> {
        match value {
            0 => Some(ClassLabel::Bottom),
            1 => Some(ClassLabel::Top),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClassLabel::Bottom => "Bottom",
            ClassLabel::Top => "Top",
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tie rule for the per-date percentile rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Tied values share the mean of the ranks they span
    #[default]
    Average,

    /// Tied values are ranked in entity-id order
    First,
}

/// Configuration for target and label construction.
///
/// # Common Configurations
///
/// | Use Case | Horizon | Top/Bottom | Notes |
/// |----------|---------|------------|-------|
/// | Weekly (default) | 5 | 0.30 / 0.30 | Daily bars |
/// | Monthly | 20 | 0.20 / 0.20 | Sparser labels |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Forecast horizon H in rows (trading days)
    pub horizon: usize,

    /// Fraction of each date's cross-section labeled Top
    pub top_frac: f64,

    /// Fraction of each date's cross-section labeled Bottom
    pub bottom_frac: f64,

    /// Rows with |target_excess_log| >= this are discarded
    pub outlier_abs_max: f64,

    /// Surviving targets are clipped to ±this
    pub clip_abs: f64,

    /// Percentile tie rule
    pub tie_break: TieBreak,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            top_frac: 0.30,
            bottom_frac: 0.30,
            outlier_abs_max: 1.0,
            clip_abs: 0.4,
            tie_break: TieBreak::Average,
        }
    }
}

impl LabelConfig {
    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set symmetric top/bottom fractions.
    pub fn with_fractions(mut self, top_frac: f64, bottom_frac: f64) -> Self {
        self.top_frac = top_frac;
        self.bottom_frac = bottom_frac;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.horizon == 0 {
            return Err("horizon must be > 0".to_string());
        }
        for (name, v) in [("top_frac", self.top_frac), ("bottom_frac", self.bottom_frac)] {
            if !(v > 0.0 && v < 1.0) {
                return Err(format!("{} must be in (0, 1), got {}", name, v));
            }
        }
        if self.top_frac + self.bottom_frac >= 1.0 {
            return Err(format!(
                "top_frac + bottom_frac must be < 1 (got {} + {})",
                self.top_frac, self.bottom_frac
            ));
        }
        if !(self.clip_abs > 0.0) {
            return Err("clip_abs must be > 0".to_string());
        }
        if !(self.outlier_abs_max > 0.0) {
            return Err("outlier_abs_max must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Label statistics for validation and analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Rows carrying a regression target
    pub total: usize,

    /// Rows labeled Top
    pub top_count: usize,

    /// Rows labeled Bottom
    pub bottom_count: usize,

    /// Middle-band rows (weight 0)
    pub unlabeled_count: usize,

    /// Rows discarded as outliers
    pub outliers_discarded: usize,

    /// Rows whose target was clipped
    pub clipped: usize,

    /// Distinct dates ranked for classification
    pub dates_ranked: usize,

    /// Mean of target_excess_log
    pub avg_excess: f64,

    /// Sample std of target_excess_log
    pub std_excess: f64,

    pub min_excess: f64,

    pub max_excess: f64,
}

impl LabelStats {
    /// Summarise a labeled table.
    pub fn from_rows(rows: &[LabeledRow]) -> Self {
        let excess: Vec<f64> = rows.iter().map(|r| r.target_excess_log).collect();
        let mut stats = Self {
            total: rows.len(),
            avg_excess: crate::stats::mean(&excess).unwrap_or(0.0),
            std_excess: crate::stats::sample_std(&excess).unwrap_or(0.0),
            min_excess: excess.iter().copied().fold(f64::INFINITY, f64::min),
            max_excess: excess.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ..Default::default()
        };
        if rows.is_empty() {
            stats.min_excess = 0.0;
            stats.max_excess = 0.0;
        }
        for row in rows {
            match row.cls_label {
                Some(ClassLabel::Top) => stats.top_count += 1,
                Some(ClassLabel::Bottom) => stats.bottom_count += 1,
                None => stats.unlabeled_count += 1,
            }
        }
        stats
    }

    /// (top, bottom, unlabeled) fractions in [0, 1].
    pub fn class_balance(&self) -> (f64, f64, f64) {
        if self.total == 0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.total as f64;
        (
            self.top_count as f64 / total,
            self.bottom_count as f64 / total,
            self.unlabeled_count as f64 / total,
        )
    }

    /// Rows usable for classification.
    pub fn labeled_count(&self) -> usize {
        self.top_count + self.bottom_count
    }
}

// ============================================================================
// Constructor
// ============================================================================

/// Applies the label-side transformations of [`LabelConfig`].
#[derive(Debug, Clone, Default)]
pub struct LabelConstructor {
    config: LabelConfig,
}

impl LabelConstructor {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Forward log returns over the configured horizon.
    pub fn forward_targets(
        &self,
        rows: Vec<crate::schema::FeatureRow>,
    ) -> (Vec<LabeledRow>, usize) {
        horizon_targets(rows, self.config.horizon)
    }

    /// Discard outliers, then clip. Returns (rows, discarded, clipped).
    pub fn bound_excess(&self, rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize, usize) {
        let before = rows.len();
        let limit = self.config.clip_abs;
        let mut clipped = 0;

        let kept: Vec<LabeledRow> = rows
            .into_iter()
            .filter(|r| r.target_excess_log.abs() < self.config.outlier_abs_max)
            .map(|mut r| {
                if r.target_excess_log.abs() > limit {
                    r.target_excess_log = r.target_excess_log.clamp(-limit, limit);
                    clipped += 1;
                }
                r
            })
            .collect();

        let discarded = before - kept.len();
        log::info!(
            "Excess target bounds: discarded {} outliers (|x| >= {}), clipped {} to ±{}",
            discarded,
            self.config.outlier_abs_max,
            clipped,
            limit
        );
        (kept, discarded, clipped)
    }

    /// Per-date top/bottom labels on the surviving cross-section.
    pub fn assign_classes(&self, mut rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize) {
        let dates = assign_classes(&mut rows, &self.config);
        (rows, dates)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::cross_section::tests::labeled;

    #[test]
    fn test_class_label_conversion() {
        assert_eq!(ClassLabel::Top.as_int(), 1);
        assert_eq!(ClassLabel::Bottom.as_int(), 0);
        assert_eq!(ClassLabel::from_int(0), Some(ClassLabel::Bottom));
        assert_eq!(ClassLabel::from_int(2), None);
        assert_eq!(ClassLabel::Top.to_string(), "Top");
    }

    #[test]
    fn test_config_validation() {
        assert!(LabelConfig::default().validate().is_ok());
        assert!(LabelConfig::default().with_horizon(0).validate().is_err());
        assert!(LabelConfig::default()
            .with_fractions(0.5, 0.5)
            .validate()
            .is_err());
        assert!(LabelConfig::default()
            .with_fractions(0.0, 0.3)
            .validate()
            .is_err());
    }

    #[test]
    fn test_discard_then_clip() {
        let mut rows = Vec::new();
        for (i, x) in [1.0, -1.2, 0.99, -0.5, 0.1].iter().enumerate() {
            let mut r = labeled("A", i as u32 + 1, 0.0, 0.0);
            r.target_excess_log = *x;
            rows.push(r);
        }
        let (kept, discarded, clipped) = LabelConstructor::default().bound_excess(rows);

        assert_eq!(discarded, 2);
        assert_eq!(clipped, 2);
        let values: Vec<f64> = kept.iter().map(|r| r.target_excess_log).collect();
        assert_eq!(values, vec![0.4, -0.4, 0.1]);
    }

    #[test]
    fn test_label_stats() {
        let mut rows: Vec<LabeledRow> = (0..10)
            .map(|i| {
                let mut r = labeled(&format!("E{}", i), 1, 0.0, 0.0);
                r.target_excess_log = i as f64 / 100.0;
                r
            })
            .collect();
        assign_classes(&mut rows, &LabelConfig::default());
        let stats = LabelStats::from_rows(&rows);

        assert_eq!(stats.total, 10);
        assert_eq!(stats.top_count, 4);
        assert_eq!(stats.bottom_count, 3);
        assert_eq!(stats.unlabeled_count, 3);
        assert_eq!(stats.labeled_count(), 7);
        assert!((stats.max_excess - 0.09).abs() < 1e-12);
    }
}

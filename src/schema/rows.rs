//! Row types flowing between pipeline stages.
//!
//! ```text
//! ObservationRow ─▶ FeatureRow ─▶ LabeledRow ─▶ Sequence (sequence_builder)
//!  (ingest)        (indicators)   (labeling)
//! ```
//!
//! Each stage consumes one table and produces a new one; rows are never
//! mutated in place by a later stage.

use super::feature_def::FEATURE_COUNT;
use crate::labeling::ClassLabel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily observation for one entity after ingestion and gap filling.
///
/// Invariants (enforced by [`crate::ingest`]): unique per `(entity_id, date)`,
/// `close > 0`, ascending by date within an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// Security identifier
    pub entity_id: String,
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// 52-week high
    pub high_52w: f64,
    /// 52-week low
    pub low_52w: f64,
    /// Reference base price
    pub base_price: f64,
    /// Current quoted price
    pub current_price: f64,
    /// Traded volume
    pub volume: f64,
    /// Activity rank
    pub rank: f64,
    /// Accumulated traded volume
    pub acc_volume: f64,
    /// Listed share count
    pub listed_shares: f64,
}

impl ObservationRow {
    /// The twelve raw numeric fields in feature-schema order.
    #[inline]
    pub fn raw_fields(&self) -> [f64; 12] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.high_52w,
            self.low_52w,
            self.base_price,
            self.current_price,
            self.volume,
            self.rank,
            self.acc_volume,
            self.listed_shares,
        ]
    }
}

/// Entity-local technical indicators for one row.
///
/// Every value depends only on the same entity's rows at or before the row's
/// date. `rsi_14` is NaN on an entity's first row (no price change yet).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicators {
    pub ma_5: f64,
    pub ma_10: f64,
    pub rsi_14: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub ret_1d: f64,
    pub ret_5d: f64,
    pub vol_10d: f64,
    pub close_ma10_dev: f64,
    /// close × volume
    pub turnover: f64,
    /// Rolling mean of turnover over the liquidity window
    pub turnover_ma: f64,
    pub vol_z_20: f64,
}

/// Observation plus its entity-local indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub observation: ObservationRow,
    pub indicators: Indicators,
}

impl FeatureRow {
    #[inline]
    pub fn entity_id(&self) -> &str {
        &self.observation.entity_id
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.observation.date
    }

    #[inline]
    pub fn close(&self) -> f64 {
        self.observation.close
    }
}

/// Feature row with its horizon target, cross-sectional excess quantities and
/// classification label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    pub features: FeatureRow,

    /// 1-period log return minus the same-date market mean
    pub xret_1d: f64,

    /// 5-period log return minus the same-date market mean
    pub xret_5d: f64,

    /// ln(close[t+H] / close[t])
    pub target_log: f64,

    /// Same-date cross-sectional mean of `target_log`
    pub market_target_log: f64,

    /// `target_log - market_target_log`, outlier-filtered and clipped
    pub target_excess_log: f64,

    /// Top/bottom bucket, `None` for the excluded middle band
    pub cls_label: Option<ClassLabel>,

    /// 1.0 iff `cls_label` is defined
    pub cls_weight: f64,
}

impl LabeledRow {
    /// Create a row carrying only its horizon target; cross-sectional fields
    /// are zero until the normalisation stage fills them.
    pub fn with_target(features: FeatureRow, target_log: f64) -> Self {
        Self {
            features,
            xret_1d: 0.0,
            xret_5d: 0.0,
            target_log,
            market_target_log: 0.0,
            target_excess_log: 0.0,
            cls_label: None,
            cls_weight: 0.0,
        }
    }

    #[inline]
    pub fn entity_id(&self) -> &str {
        self.features.entity_id()
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.features.date()
    }

    #[inline]
    pub fn close(&self) -> f64 {
        self.features.close()
    }

    /// Model feature vector in [`super::FEATURE_NAMES`] order.
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        let raw = self.features.observation.raw_fields();
        let ind = &self.features.indicators;
        [
            raw[0],
            raw[1],
            raw[2],
            raw[3],
            raw[4],
            raw[5],
            raw[6],
            raw[7],
            raw[8],
            raw[9],
            raw[10],
            raw[11],
            ind.ma_5,
            ind.ma_10,
            ind.rsi_14,
            ind.macd,
            ind.macd_signal,
            ind.ret_1d,
            ind.ret_5d,
            ind.vol_10d,
            ind.close_ma10_dev,
            ind.vol_z_20,
            self.xret_1d,
            self.xret_5d,
        ]
    }

    /// Whether every model feature is finite.
    pub fn is_complete(&self) -> bool {
        self.feature_vector().iter().all(|v| v.is_finite())
    }
}

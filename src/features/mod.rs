//! Per-entity indicator computation.
//!
//! # Architecture
//!
//! The engine is a pure function of one entity's chronologically sorted
//! history. Panel-level computation splits the panel by entity, runs every
//! entity independently (in parallel with rayon), and concatenates the results:
//!
//! ```text
//! ObservationRow panel
//!        │ group by entity_id, sort by date
//!        ▼
//! ┌──────────┐ ┌──────────┐     ┌──────────┐
//! │ entity A │ │ entity B │ ... │ entity N │   (rayon, no shared state)
//! └────┬─────┘ └────┬─────┘     └────┬─────┘
//!      └────────────┴──── concat ────┘
//!                     ▼
//!              FeatureRow panel
//! ```
//!
//! - `rolling`: trailing-window mean / sample std with `min_periods = 1`, EMA
//! - `indicators`: RSI, MACD, log returns, volatility, volume z-score
//!
//! # Usage
//!
//! ```ignore
//! use excess_return_pipeline::features::{IndicatorConfig, IndicatorEngine};
//!
//! let engine = IndicatorEngine::new(IndicatorConfig::default());
//! let feature_rows = engine.compute_panel(&ingested.rows);
//! ```

pub mod indicators;
pub mod rolling;

use crate::schema::{FeatureRow, Indicators, ObservationRow};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Window lengths and numeric guards for the indicator set.
///
/// # Example
///
/// ```
/// use excess_return_pipeline::features::IndicatorConfig;
///
/// let config = IndicatorConfig::default().with_liquidity_window(20);
/// assert_eq!(config.liquidity_window, 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Short moving-average window
    pub ma_short: usize,

    /// Long moving-average window (also the reference for `close_ma10_dev`)
    pub ma_long: usize,

    /// RSI averaging window
    pub rsi_period: usize,

    /// MACD fast EMA span
    pub macd_fast: usize,

    /// MACD slow EMA span
    pub macd_slow: usize,

    /// MACD signal EMA span
    pub macd_signal: usize,

    /// Long log-return lag (the short lag is always 1)
    pub return_lag: usize,

    /// Rolling window for return volatility
    pub volatility_window: usize,

    /// Rolling window for the volume z-score
    pub volume_z_window: usize,

    /// Rolling window for mean turnover (liquidity proxy)
    pub liquidity_window: usize,

    /// Denominator guard for ratio indicators
    pub epsilon: f64,
}

impl IndicatorConfig {
    /// Set the turnover averaging window.
    pub fn with_liquidity_window(mut self, window: usize) -> Self {
        self.liquidity_window = window;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let windows = [
            ("ma_short", self.ma_short),
            ("ma_long", self.ma_long),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("return_lag", self.return_lag),
            ("volatility_window", self.volatility_window),
            ("volume_z_window", self.volume_z_window),
            ("liquidity_window", self.liquidity_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(format!("{} must be > 0", name));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(format!(
                "macd_fast ({}) must be < macd_slow ({})",
                self.macd_fast, self.macd_slow
            ));
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err("epsilon must be a positive finite number".to_string());
        }
        Ok(())
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_long: 10,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            return_lag: 5,
            volatility_window: 10,
            volume_z_window: 20,
            liquidity_window: 60,
            epsilon: 1e-9,
        }
    }
}

/// Computes [`Indicators`] for each entity independently.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Indicators for one entity's history, which must be sorted by date.
    ///
    /// Row `i` of the output depends only on rows `0..=i` of the input.
    pub fn compute_entity(&self, rows: &[ObservationRow]) -> Vec<FeatureRow> {
        let cfg = &self.config;
        let eps = cfg.epsilon;

        let close: Vec<f64> = rows.iter().map(|r| r.close).collect();
        let volume: Vec<f64> = rows.iter().map(|r| r.volume).collect();

        let ma_5 = rolling::rolling_mean(&close, cfg.ma_short);
        let ma_10 = rolling::rolling_mean(&close, cfg.ma_long);
        let rsi_14 = indicators::rsi(&close, cfg.rsi_period, eps);
        let (macd, macd_signal) =
            indicators::macd(&close, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let ret_1d = indicators::log_returns(&close, 1);
        let ret_5d = indicators::log_returns(&close, cfg.return_lag);
        let vol_10d = indicators::rolling_volatility(&ret_1d, cfg.volatility_window);
        let turnover: Vec<f64> = close
            .iter()
            .zip(&volume)
            .map(|(c, v)| {
                let t = c * v;
                if t.is_nan() {
                    0.0
                } else {
                    t
                }
            })
            .collect();
        let turnover_ma = rolling::rolling_mean(&turnover, cfg.liquidity_window);
        let vol_z_20 = indicators::volume_zscore(&volume, cfg.volume_z_window, eps);

        rows.iter()
            .enumerate()
            .map(|(i, obs)| {
                let dev = close[i] / (ma_10[i] + eps) - 1.0;
                FeatureRow {
                    observation: obs.clone(),
                    indicators: Indicators {
                        ma_5: ma_5[i],
                        ma_10: ma_10[i],
                        rsi_14: rsi_14[i],
                        macd: macd[i],
                        macd_signal: macd_signal[i],
                        ret_1d: ret_1d[i],
                        ret_5d: ret_5d[i],
                        vol_10d: vol_10d[i],
                        close_ma10_dev: if dev.is_nan() { 0.0 } else { dev },
                        turnover: turnover[i],
                        turnover_ma: if turnover_ma[i].is_nan() {
                            0.0
                        } else {
                            turnover_ma[i]
                        },
                        vol_z_20: vol_z_20[i],
                    },
                }
            })
            .collect()
    }

    /// Indicators for a whole panel.
    ///
    /// Rows are grouped by entity and sorted by date before computation, so
    /// windows never span two entities. Output is ordered by (entity_id, date).
    pub fn compute_panel(&self, rows: &[ObservationRow]) -> Vec<FeatureRow> {
        let mut groups: BTreeMap<&str, Vec<&ObservationRow>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.entity_id.as_str()).or_default().push(row);
        }

        let groups: Vec<Vec<ObservationRow>> = groups
            .into_values()
            .map(|mut g| {
                g.sort_by_key(|r| r.date);
                g.into_iter().cloned().collect()
            })
            .collect();

        let out: Vec<FeatureRow> = groups
            .par_iter()
            .flat_map_iter(|g| self.compute_entity(g))
            .collect();

        log::info!(
            "Computed indicators for {} rows across {} entities",
            out.len(),
            groups.len()
        );
        out
    }
}

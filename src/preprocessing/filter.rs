//! Row filters applied after target construction.
//!
//! - [`LiquidityFilter`]: minimum mean turnover and minimum close price
//! - [`drop_incomplete`]: rows with any non-finite model feature

use crate::schema::LabeledRow;

/// Liquidity / price thresholds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum rolling mean turnover (close × volume)
    pub min_turnover: f64,

    /// Minimum close price
    pub min_price: f64,
}

impl FilterConfig {
    /// Disable both thresholds.
    pub fn permissive() -> Self {
        Self {
            min_turnover: 0.0,
            min_price: 0.0,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.min_turnover >= 0.0 && self.min_turnover.is_finite()) {
            return Err(format!("min_turnover must be >= 0 (got {})", self.min_turnover));
        }
        if !(self.min_price >= 0.0 && self.min_price.is_finite()) {
            return Err(format!("min_price must be >= 0 (got {})", self.min_price));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_turnover: 2e8,
            min_price: 5000.0,
        }
    }
}

/// Drops illiquid or low-priced rows.
#[derive(Debug, Clone, Default)]
pub struct LiquidityFilter {
    config: FilterConfig,
}

impl LiquidityFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Whether a row passes both thresholds.
    #[inline]
    pub fn passes(&self, row: &LabeledRow) -> bool {
        row.features.indicators.turnover_ma >= self.config.min_turnover
            && row.close() >= self.config.min_price
    }

    /// Keep passing rows; returns the survivors and the number dropped.
    pub fn apply(&self, rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize) {
        let before = rows.len();
        let kept: Vec<LabeledRow> = rows.into_iter().filter(|r| self.passes(r)).collect();
        let dropped = before - kept.len();
        log::info!(
            "Liquidity filter (turnover >= {:.3e}, close >= {}): kept {}, dropped {}",
            self.config.min_turnover,
            self.config.min_price,
            kept.len(),
            dropped
        );
        (kept, dropped)
    }
}

/// Drop rows whose feature vector or excess target is not finite.
pub fn drop_incomplete(rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize) {
    let before = rows.len();
    let kept: Vec<LabeledRow> = rows
        .into_iter()
        .filter(|r| r.is_complete() && r.target_excess_log.is_finite())
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        log::debug!("Dropped {} incomplete feature rows", dropped);
    }
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::cross_section::tests::labeled;

    #[test]
    fn test_liquidity_thresholds_inclusive() {
        let mut liquid = labeled("A", 1, 0.0, 0.0);
        liquid.features.indicators.turnover_ma = 2e8;
        liquid.features.observation.close = 5000.0;

        let mut cheap = liquid.clone();
        cheap.features.observation.close = 4999.0;

        let mut thin = liquid.clone();
        thin.features.indicators.turnover_ma = 1e8;

        let (kept, dropped) = LiquidityFilter::default().apply(vec![liquid, cheap, thin]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_drop_incomplete() {
        let ok = labeled("A", 1, 0.0, 0.0);
        let mut warm_up = ok.clone();
        warm_up.features.indicators.rsi_14 = f64::NAN;

        let (kept, dropped) = drop_incomplete(vec![ok, warm_up]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_validate() {
        assert!(FilterConfig::default().validate().is_ok());
        assert!(FilterConfig {
            min_price: -1.0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}

//! Same-date market means and market-relative (excess) quantities.
//!
//! For each date, the market proxy is the equal-weight mean across every entity
//! present in the table passed in. Means are computed from that table and never
//! carried over from an earlier stage, so the caller controls membership by
//! filtering before calling.
//!
//! ```text
//! date  entity  target_log        market  target_excess_log
//! d1    A        0.10     ┐
//! d1    B       -0.02     ├─ 0.04 ─▶      0.06 / -0.06 / 0.00
//! d1    C        0.04     ┘
//! ```

use crate::schema::LabeledRow;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-date mean of one column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketMeans {
    means: BTreeMap<NaiveDate, f64>,
}

impl MarketMeans {
    /// Equal-weight mean of `value(row)` per `date(row)`; non-finite values are ignored.
    pub fn compute<T>(
        rows: &[T],
        date: impl Fn(&T) -> NaiveDate,
        value: impl Fn(&T) -> f64,
    ) -> Self {
        let mut acc: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for row in rows {
            let v = value(row);
            if !v.is_finite() {
                continue;
            }
            let e = acc.entry(date(row)).or_insert((0.0, 0));
            e.0 += v;
            e.1 += 1;
        }
        Self {
            means: acc
                .into_iter()
                .map(|(d, (sum, n))| (d, sum / n as f64))
                .collect(),
        }
    }

    /// Mean for a date; NaN if no finite value was observed that day.
    #[inline]
    pub fn get(&self, date: NaiveDate) -> f64 {
        self.means.get(&date).copied().unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.means.iter().map(|(d, v)| (*d, *v))
    }
}

/// Subtracts same-date market means from labeled rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossSectionalNormalizer;

impl CrossSectionalNormalizer {
    /// Set `market_target_log` and `target_excess_log = target_log - market`.
    pub fn excess_targets(&self, mut rows: Vec<LabeledRow>) -> Vec<LabeledRow> {
        let market = MarketMeans::compute(&rows, |r| r.date(), |r| r.target_log);
        for row in rows.iter_mut() {
            row.market_target_log = market.get(row.date());
            row.target_excess_log = row.target_log - row.market_target_log;
        }
        log::debug!("Market target means computed for {} dates", market.len());
        rows
    }

    /// Set `xret_1d` / `xret_5d` from the same-date means of `ret_1d` / `ret_5d`.
    pub fn excess_returns(&self, mut rows: Vec<LabeledRow>) -> Vec<LabeledRow> {
        let m1 = MarketMeans::compute(&rows, |r| r.date(), |r| r.features.indicators.ret_1d);
        let m5 = MarketMeans::compute(&rows, |r| r.date(), |r| r.features.indicators.ret_5d);
        for row in rows.iter_mut() {
            let d = row.date();
            row.xret_1d = row.features.indicators.ret_1d - m1.get(d);
            row.xret_5d = row.features.indicators.ret_5d - m5.get(d);
        }
        rows
    }
}

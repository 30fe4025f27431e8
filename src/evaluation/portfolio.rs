//! Portfolio-style evaluation of predicted excess returns.
//!
//! # Long-short spread
//!
//! Per date with `n >= min_n` entities, sort by prediction and take
//! `k = max(1, floor(n * top_frac))` names on each side:
//!
//! ```text
//! spread = mean(realized | top k) - mean(realized | bottom k)
//! hit    = share of the top k with realized > 0
//! ```
//!
//! The purged variant keeps only every `horizon`-th date of the sorted unique
//! test dates, so consecutive dates never share a forward return window.
//!
//! # Quantile buckets
//!
//! Per date with `n >= Q` entities, ordinal rank r (stable on ties) maps to
//!
//! ```text
//! b = max(1, ceil((r - 1) * Q / (n - 1)))
//! ```
//!
//! giving equal-population buckets. Bucket means are averaged across dates.

use super::{group_by_date, EvaluationRecord};
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

// ============================================================================
// Long-short
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongShortDay {
    pub date: NaiveDate,
    pub n: usize,
    pub k: usize,
    pub spread: f64,
    pub top_hit: f64,
    pub r_top: f64,
    pub r_bottom: f64,
}

/// Summary of one spread series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub n_dates: usize,
    pub mean_hit_rate: Option<f64>,

    /// Compounded `prod(1 + s) - 1` after each date
    pub cumulative: Vec<f64>,
}

impl SpreadSummary {
    pub fn from_days(days: &[LongShortDay]) -> Self {
        let spreads: Vec<f64> = days.iter().map(|d| d.spread).collect();
        let hits: Vec<f64> = days.iter().map(|d| d.top_hit).collect();
        Self {
            mean: stats::mean(&spreads),
            std: stats::sample_std(&spreads),
            n_dates: days.len(),
            mean_hit_rate: stats::mean(&hits),
            cumulative: cumulative_returns(&spreads),
        }
    }

    /// Final compounded return, if any date was used.
    pub fn total_return(&self) -> Option<f64> {
        self.cumulative.last().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongShortReport {
    pub days: Vec<LongShortDay>,
    pub summary: SpreadSummary,
    pub dates_skipped: usize,
}

/// `prod(1 + s_i) - 1` after each element.
pub fn cumulative_returns(series: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    series
        .iter()
        .map(|s| {
            acc *= 1.0 + s;
            acc - 1.0
        })
        .collect()
}

/// Every `step`-th date of the sorted unique dates, starting with the first.
pub fn purged_dates(records: &[EvaluationRecord], step: usize) -> BTreeSet<NaiveDate> {
    let unique: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    unique.into_iter().step_by(step.max(1)).collect()
}

// ============================================================================
// Buckets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDay {
    pub date: NaiveDate,

    /// Mean realized excess per bucket (index 0 = lowest prediction)
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketReport {
    pub n_buckets: usize,
    pub days: Vec<BucketDay>,

    /// Per-bucket average over the dates where the bucket was populated
    pub mean_by_bucket: Vec<Option<f64>>,

    /// Top bucket mean minus bottom bucket mean
    pub top_minus_bottom: Option<f64>,

    pub dates_skipped: usize,
}

/// Bucket (1-based) of ordinal rank `rank` among `n` with `q` buckets.
pub fn bucket_of(rank: usize, n: usize, q: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let num = (rank - 1) * q;
    let den = n - 1;
    num.div_ceil(den).clamp(1, q)
}

// ============================================================================
// Evaluator
// ============================================================================

/// Long-short and bucket evaluation over test records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioEvaluator {
    top_frac: f64,
    min_n: usize,
    n_buckets: usize,
}

impl PortfolioEvaluator {
    pub fn new(top_frac: f64, min_n: usize, n_buckets: usize) -> Self {
        Self {
            top_frac,
            min_n,
            n_buckets,
        }
    }

    /// Per-date long-short spread over the given records.
    pub fn long_short(&self, records: &[EvaluationRecord]) -> LongShortReport {
        let mut days = Vec::new();
        let mut skipped = 0;

        for (date, group) in group_by_date(records) {
            let mut pairs: Vec<(f64, f64)> = group
                .iter()
                .filter(|r| r.predicted_excess.is_finite() && r.realized_excess.is_finite())
                .map(|r| (r.predicted_excess, r.realized_excess))
                .collect();
            let n = pairs.len();
            if n < self.min_n || n == 0 {
                skipped += 1;
                continue;
            }

            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            let k = ((n as f64 * self.top_frac).floor() as usize).max(1).min(n);

            let bottom: Vec<f64> = pairs[..k].iter().map(|p| p.1).collect();
            let top: Vec<f64> = pairs[n - k..].iter().map(|p| p.1).collect();
            let r_top = stats::mean(&top).unwrap_or(0.0);
            let r_bottom = stats::mean(&bottom).unwrap_or(0.0);
            let hits = top.iter().filter(|v| **v > 0.0).count();

            days.push(LongShortDay {
                date,
                n,
                k,
                spread: r_top - r_bottom,
                top_hit: hits as f64 / k as f64,
                r_top,
                r_bottom,
            });
        }

        LongShortReport {
            summary: SpreadSummary::from_days(&days),
            days,
            dates_skipped: skipped,
        }
    }

    /// Long-short restricted to dates spaced `horizon` apart.
    pub fn long_short_purged(&self, records: &[EvaluationRecord], horizon: usize) -> LongShortReport {
        let allowed = purged_dates(records, horizon);
        let subset: Vec<EvaluationRecord> = records
            .iter()
            .filter(|r| allowed.contains(&r.date))
            .cloned()
            .collect();
        log::debug!(
            "Purged spread: {} of {} records on {} dates (stride {})",
            subset.len(),
            records.len(),
            allowed.len(),
            horizon
        );
        self.long_short(&subset)
    }

    /// Mean realized excess per predicted-score bucket.
    pub fn buckets(&self, records: &[EvaluationRecord]) -> BucketReport {
        let q = self.n_buckets;
        let mut days = Vec::new();
        let mut skipped = 0;

        for (date, group) in group_by_date(records) {
            let (pred, real): (Vec<f64>, Vec<f64>) = group
                .iter()
                .filter(|r| r.predicted_excess.is_finite() && r.realized_excess.is_finite())
                .map(|r| (r.predicted_excess, r.realized_excess))
                .unzip();
            let n = pred.len();
            if n < q || n < 2 {
                skipped += 1;
                continue;
            }

            let ranks = stats::ordinal_ranks(&pred);
            let mut sums = vec![0.0; q];
            let mut counts = vec![0usize; q];
            for (rank, value) in ranks.iter().zip(&real) {
                let b = bucket_of(*rank, n, q) - 1;
                sums[b] += value;
                counts[b] += 1;
            }
            let means = sums
                .iter()
                .zip(&counts)
                .map(|(s, &c)| if c > 0 { Some(s / c as f64) } else { None })
                .collect();
            days.push(BucketDay { date, means });
        }

        let mean_by_bucket: Vec<Option<f64>> = (0..q)
            .map(|b| {
                let values: Vec<f64> = days.iter().filter_map(|d| d.means[b]).collect();
                stats::mean(&values)
            })
            .collect();
        let top_minus_bottom = match (mean_by_bucket.first(), mean_by_bucket.last()) {
            (Some(Some(lo)), Some(Some(hi))) => Some(hi - lo),
            _ => None,
        };

        BucketReport {
            n_buckets: q,
            days,
            mean_by_bucket,
            top_minus_bottom,
            dates_skipped: skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::tests::record;

    fn cross_section(day: u32, n: usize) -> Vec<EvaluationRecord> {
        // prediction and realized both increase with i
        (0..n)
            .map(|i| {
                let v = i as f64 / 100.0 - 0.05;
                record(&format!("E{i:02}"), day, v, v)
            })
            .collect()
    }

    #[test]
    fn test_long_short_basic() {
        let records = cross_section(1, 10);
        let report = PortfolioEvaluator::new(0.2, 10, 5).long_short(&records);
        assert_eq!(report.days.len(), 1);
        let day = report.days[0];
        assert_eq!(day.k, 2);
        // top: 0.03, 0.04 ; bottom: -0.05, -0.04
        assert!((day.r_top - 0.035).abs() < 1e-12);
        assert!((day.r_bottom + 0.045).abs() < 1e-12);
        assert!((day.spread - 0.08).abs() < 1e-12);
        assert_eq!(day.top_hit, 1.0);
    }

    #[test]
    fn test_small_cross_section_skipped() {
        let mut records = cross_section(1, 10);
        records.extend(cross_section(2, 2));
        let report = PortfolioEvaluator::new(0.2, 10, 5).long_short(&records);
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.dates_skipped, 1);
    }

    #[test]
    fn test_purged_dates_stride() {
        let records: Vec<_> = (1..=12).flat_map(|d| cross_section(d, 10)).collect();
        let dates: Vec<NaiveDate> = purged_dates(&records, 5).into_iter().collect();
        assert_eq!(dates.len(), 3);
        for w in dates.windows(2) {
            assert_eq!((w[1] - w[0]).num_days(), 5);
        }

        let report = PortfolioEvaluator::new(0.2, 10, 5).long_short_purged(&records, 5);
        assert_eq!(report.summary.n_dates, 3);
    }

    #[test]
    fn test_cumulative_returns() {
        let c = cumulative_returns(&[0.1, -0.1]);
        assert!((c[0] - 0.1).abs() < 1e-12);
        assert!((c[1] - (1.1 * 0.9 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_bucket_of_equal_population() {
        let assigned: Vec<usize> = (1..=10).map(|r| bucket_of(r, 10, 5)).collect();
        assert_eq!(assigned, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
        let five: Vec<usize> = (1..=5).map(|r| bucket_of(r, 5, 5)).collect();
        assert_eq!(five, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_buckets_monotone_and_ties() {
        let records = cross_section(1, 10);
        let report = PortfolioEvaluator::new(0.2, 10, 5).buckets(&records);
        assert_eq!(report.days.len(), 1);
        let top = report.mean_by_bucket[4].unwrap();
        let bottom = report.mean_by_bucket[0].unwrap();
        assert!(top > bottom);
        assert!((report.top_minus_bottom.unwrap() - (top - bottom)).abs() < 1e-15);

        // all predictions tied: ordinal ranks still fill every bucket
        let tied: Vec<_> = (0..5).map(|i| record(&format!("T{i}"), 2, 0.0, i as f64)).collect();
        let report = PortfolioEvaluator::new(0.2, 10, 5).buckets(&tied);
        assert!(report.days[0].means.iter().all(|m| m.is_some()));

        let few: Vec<_> = (0..4).map(|i| record(&format!("F{i}"), 3, 0.0, 0.0)).collect();
        assert_eq!(PortfolioEvaluator::new(0.2, 10, 5).buckets(&few).dates_skipped, 1);
    }
}

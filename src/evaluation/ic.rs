//! Cross-sectional information coefficient.
//!
//! # Daily IC
//!
//! For each date, Spearman correlation between predicted and realized excess
//! return across the entities observed that date. Dates with fewer than
//! `min_n` finite pairs, or where either side is constant, are skipped and
//! counted.
//!
//! # Period aggregation
//!
//! ```text
//! mean, std (ddof = 1), n, t = mean / (std / sqrt(n))
//! ```
//!
//! `t` is `None` when `n <= 1` or the std is zero.

use super::{group_by_date, EvaluationRecord};
use crate::stats;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyIc {
    pub date: NaiveDate,
    pub ic: f64,
    /// Pairs used
    pub n: usize,
}

/// Calendar bucket for IC aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Month,
    Quarter,
}

impl Period {
    /// Sortable key and display label, e.g. `2024-03` or `2024Q1`.
    fn key(&self, date: NaiveDate) -> ((i32, u32), String) {
        match self {
            Period::Month => ((date.year(), date.month()), format!("{}-{:02}", date.year(), date.month())),
            Period::Quarter => {
                let q = (date.month() - 1) / 3 + 1;
                ((date.year(), q), format!("{}Q{}", date.year(), q))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodIcStats {
    pub period: String,
    pub mean: f64,
    pub std: Option<f64>,
    pub n: usize,
    pub t_stat: Option<f64>,
}

impl PeriodIcStats {
    fn from_values(period: String, values: &[f64]) -> Option<Self> {
        let mean = stats::mean(values)?;
        let std = stats::sample_std(values);
        let n = values.len();
        let t_stat = match std {
            Some(s) if n > 1 && s > 0.0 => Some(mean / (s / (n as f64).sqrt())),
            _ => None,
        };
        Some(Self {
            period,
            mean,
            std,
            n,
            t_stat,
        })
    }
}

/// IC tables for one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IcReport {
    pub daily: Vec<DailyIc>,
    pub monthly: Vec<PeriodIcStats>,
    pub quarterly: Vec<PeriodIcStats>,

    /// Mean of the daily IC
    pub mean: Option<f64>,

    /// Sample std of the daily IC
    pub std: Option<f64>,

    /// Dates skipped for too few pairs or a constant side
    pub dates_skipped: usize,
}

/// Per-date Spearman IC with period aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSectionalEvaluator {
    min_n: usize,
}

impl CrossSectionalEvaluator {
    pub fn new(min_n: usize) -> Self {
        Self { min_n }
    }

    pub fn min_n(&self) -> usize {
        self.min_n
    }

    /// Daily IC series (sorted by date) and the number of skipped dates.
    pub fn daily_ic(&self, records: &[EvaluationRecord]) -> (Vec<DailyIc>, usize) {
        let mut daily = Vec::new();
        let mut skipped = 0;

        for (date, group) in group_by_date(records) {
            let (pred, real): (Vec<f64>, Vec<f64>) = group
                .iter()
                .filter(|r| r.predicted_excess.is_finite() && r.realized_excess.is_finite())
                .map(|r| (r.predicted_excess, r.realized_excess))
                .unzip();

            if pred.len() < self.min_n {
                skipped += 1;
                continue;
            }
            match stats::spearman(&pred, &real) {
                Some(ic) if ic.is_finite() => daily.push(DailyIc {
                    date,
                    ic,
                    n: pred.len(),
                }),
                _ => skipped += 1,
            }
        }
        (daily, skipped)
    }

    /// Aggregate a daily series into calendar periods.
    pub fn aggregate(daily: &[DailyIc], period: Period) -> Vec<PeriodIcStats> {
        let mut buckets: BTreeMap<(i32, u32), (String, Vec<f64>)> = BTreeMap::new();
        for d in daily {
            let (key, label) = period.key(d.date);
            buckets.entry(key).or_insert_with(|| (label, Vec::new())).1.push(d.ic);
        }
        buckets
            .into_values()
            .filter_map(|(label, values)| PeriodIcStats::from_values(label, &values))
            .collect()
    }

    /// Daily IC plus monthly and quarterly statistics.
    pub fn evaluate(&self, records: &[EvaluationRecord]) -> IcReport {
        let (daily, dates_skipped) = self.daily_ic(records);
        let values: Vec<f64> = daily.iter().map(|d| d.ic).collect();

        if dates_skipped > 0 {
            log::info!(
                "Daily IC: {} dates computed, {} skipped (min_n = {})",
                daily.len(),
                dates_skipped,
                self.min_n
            );
        }

        IcReport {
            monthly: Self::aggregate(&daily, Period::Month),
            quarterly: Self::aggregate(&daily, Period::Quarter),
            mean: stats::mean(&values),
            std: stats::sample_std(&values),
            daily,
            dates_skipped,
        }
    }
}

//! Out-of-sample evaluation of predictor output.
//!
//! # Overview
//!
//! ```text
//! validation sequences + predictions ──▶ ThresholdOptimizer ──▶ threshold (frozen)
//!                                                                   │
//! test sequences + predictions ──▶ EvaluationRecord table ──────────┤
//!                                        │                          ▼
//!                                        ├──▶ RegressionMetrics / ClassificationMetrics
//!                                        ├──▶ CrossSectionalEvaluator (daily / monthly / quarterly IC)
//!                                        └──▶ PortfolioEvaluator (long-short, purged, buckets)
//! ```
//!
//! Predictions arrive in scaled target space. Each record converts them back
//! with the train-fit target scaler and reports simple returns:
//!
//! ```text
//! predicted_excess = exp(inverse(score)) - 1
//! predicted_raw    = exp(inverse(score) + market_target_log) - 1
//! ```
//!
//! Dates with too few entities are skipped by each evaluator and counted in
//! the report; they never fail the run.

pub mod ic;
pub mod metrics;
pub mod portfolio;
pub mod threshold;

pub use ic::{CrossSectionalEvaluator, DailyIc, IcReport, Period, PeriodIcStats};
pub use metrics::{BaselineMetrics, ClassificationMetrics, ConfusionMatrix, RegressionMetrics};
pub use portfolio::{
    BucketDay, BucketReport, LongShortDay, LongShortReport, PortfolioEvaluator, SpreadSummary,
};
pub use threshold::{roc_auc, roc_curve, RocPoint, ThresholdOptimizer, ThresholdSelection};

use crate::model::{score_to_excess, LatestForecast, Prediction};
use crate::preprocessing::TargetScaler;
use crate::sequence_builder::Sequence;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Configuration
// ============================================================================

/// Evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Minimum pairs per date for a daily IC
    pub ic_min_n: usize,

    /// Fraction of the cross-section in each long-short basket
    pub long_short_top_frac: f64,

    /// Minimum entities per date for a long-short spread
    pub spread_min_n: usize,

    /// Number of prediction buckets (Q)
    pub n_buckets: usize,

    /// Threshold used when validation has a single class
    pub default_threshold: f64,

    /// Samples per predictor call
    pub batch_size: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            ic_min_n: 3,
            long_short_top_frac: 0.2,
            spread_min_n: 10,
            n_buckets: 5,
            default_threshold: 0.5,
            batch_size: 256,
        }
    }
}

impl EvaluationConfig {
    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.ic_min_n < 2 {
            return Err(format!("ic_min_n must be >= 2, got {}", self.ic_min_n));
        }
        if !(self.long_short_top_frac > 0.0 && self.long_short_top_frac <= 0.5) {
            return Err(format!(
                "long_short_top_frac must be in (0, 0.5], got {}",
                self.long_short_top_frac
            ));
        }
        if self.spread_min_n == 0 {
            return Err("spread_min_n must be > 0".to_string());
        }
        if self.n_buckets < 2 {
            return Err(format!("n_buckets must be >= 2, got {}", self.n_buckets));
        }
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(format!(
                "default_threshold must be in [0, 1], got {}",
                self.default_threshold
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One test prediction joined with its realized outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub entity_id: String,
    pub date: NaiveDate,

    /// Simple predicted excess return
    pub predicted_excess: f64,

    /// Simple realized excess return
    pub realized_excess: f64,

    pub predicted_probability: f64,

    pub predicted_excess_log: f64,
    pub realized_excess_log: f64,

    /// Score as returned by the predictor
    pub predicted_scaled: f64,

    /// Scaled training target of the sequence
    pub realized_scaled: f64,

    /// Same-date market mean log return
    pub market_log: f64,

    /// Simple predicted return with the market mean added back
    pub predicted_raw: f64,

    /// Simple realized return with the market mean added back
    pub realized_raw: f64,

    /// 0 / 1, empty when unlabeled
    pub cls_label: Option<u8>,

    pub cls_weight: f64,
}

impl EvaluationRecord {
    pub fn from_prediction(seq: &Sequence, pred: &Prediction, target: &TargetScaler) -> Self {
        let predicted_excess_log = target.inverse_transform(pred.score);
        let realized_excess_log = seq.target_excess_log;
        Self {
            entity_id: seq.entity_id.clone(),
            date: seq.base_date,
            predicted_excess: predicted_excess_log.exp() - 1.0,
            realized_excess: realized_excess_log.exp() - 1.0,
            predicted_probability: pred.probability,
            predicted_excess_log,
            realized_excess_log,
            predicted_scaled: pred.score,
            realized_scaled: seq.target,
            market_log: seq.market_target_log,
            predicted_raw: (predicted_excess_log + seq.market_target_log).exp() - 1.0,
            realized_raw: (realized_excess_log + seq.market_target_log).exp() - 1.0,
            cls_label: seq.cls_label.map(|l| l.as_int()),
            cls_weight: seq.cls_weight,
        }
    }
}

/// Join sequences with their predictions (same order, same length).
pub fn build_records(
    sequences: &[Sequence],
    predictions: &[Prediction],
    target: &TargetScaler,
) -> Vec<EvaluationRecord> {
    sequences
        .iter()
        .zip(predictions)
        .map(|(s, p)| EvaluationRecord::from_prediction(s, p, target))
        .collect()
}

/// Records grouped by date, dates ascending.
pub(crate) fn group_by_date(records: &[EvaluationRecord]) -> BTreeMap<NaiveDate, Vec<&EvaluationRecord>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&EvaluationRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.date).or_default().push(r);
    }
    groups
}

// ============================================================================
// Report
// ============================================================================

/// Everything computed for one predictor on one prepared dataset.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub predictor: String,
    pub n_test: usize,
    pub threshold: ThresholdSelection,
    pub regression: RegressionMetrics,
    pub baseline: BaselineMetrics,
    pub classification: Option<ClassificationMetrics>,
    pub ic: IcReport,
    pub long_short: LongShortReport,
    pub long_short_purged: LongShortReport,
    pub buckets: BucketReport,

    #[serde(skip)]
    pub records: Vec<EvaluationRecord>,

    #[serde(skip)]
    pub latest: Vec<LatestForecast>,
}

impl EvaluationReport {
    /// Log the headline numbers.
    pub fn log_summary(&self) {
        let r = &self.regression;
        log::info!(
            "[{}] n={} MSE {:.6} MAE {:.6} RMSE {:.6} R2 {:.4} direction {:.3} scaled MAE {:.4}",
            self.predictor,
            self.n_test,
            r.mse,
            r.mae,
            r.rmse,
            r.r2,
            r.direction_accuracy,
            r.scaled_mae
        );
        log::info!(
            "Baseline MAE {:.6} RMSE {:.6} scaled MAE {:.4}",
            self.baseline.mae,
            self.baseline.rmse,
            self.baseline.scaled_mae
        );
        if let Some(c) = &self.classification {
            log::info!(
                "Cls@0.5 acc {:.3} AUC {} | @{:.3} acc {:.3} P {:.3} R {:.3} F1 {:.3}",
                c.accuracy_at_half,
                fmt_opt(c.auc),
                c.threshold,
                c.accuracy,
                c.precision,
                c.recall,
                c.f1
            );
        }
        log::info!(
            "Daily IC mean {} std {} over {} dates ({} skipped)",
            fmt_opt(self.ic.mean),
            fmt_opt(self.ic.std),
            self.ic.daily.len(),
            self.ic.dates_skipped
        );
        for (name, ls) in [("overlapped", &self.long_short), ("purged", &self.long_short_purged)] {
            log::info!(
                "Long-short ({}): mean {} std {} n {} hit {}",
                name,
                fmt_opt(ls.summary.mean),
                fmt_opt(ls.summary.std),
                ls.summary.n_dates,
                fmt_opt(ls.summary.mean_hit_rate)
            );
        }
        log::info!("Q{}-Q1 spread: {}", self.buckets.n_buckets, fmt_opt(self.buckets.top_minus_bottom));
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "N/A".to_string())
}

// ============================================================================
// Evaluator
// ============================================================================

/// Runs every evaluator over already-computed predictions.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluationConfig,
    horizon: usize,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig, horizon: usize) -> Self {
        Self { config, horizon }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Pick the decision threshold on validation predictions.
    pub fn select_threshold(&self, validation: &[Sequence], predictions: &[Prediction]) -> ThresholdSelection {
        ThresholdOptimizer::new(self.config.default_threshold).fit(validation, predictions)
    }

    /// Evaluate test predictions against a frozen threshold.
    pub fn evaluate(
        &self,
        predictor: &str,
        threshold: ThresholdSelection,
        test: &[Sequence],
        predictions: &[Prediction],
        baseline: &[Prediction],
        target: &TargetScaler,
    ) -> EvaluationReport {
        let records = build_records(test, predictions, target);

        let baseline_scaled: Vec<f64> = baseline.iter().map(|p| p.score).collect();
        let baseline_excess: Vec<f64> = baseline_scaled
            .iter()
            .map(|s| score_to_excess(target, *s))
            .collect();

        let portfolio = PortfolioEvaluator::new(
            self.config.long_short_top_frac,
            self.config.spread_min_n,
            self.config.n_buckets,
        );

        EvaluationReport {
            predictor: predictor.to_string(),
            n_test: records.len(),
            threshold,
            regression: RegressionMetrics::compute(&records),
            baseline: BaselineMetrics::compute(&records, &baseline_excess, &baseline_scaled),
            classification: ClassificationMetrics::compute(&records, threshold.threshold),
            ic: CrossSectionalEvaluator::new(self.config.ic_min_n).evaluate(&records),
            long_short: portfolio.long_short(&records),
            long_short_purged: portfolio.long_short_purged(&records, self.horizon),
            buckets: portfolio.buckets(&records),
            records,
            latest: Vec::new(),
        }
    }
}

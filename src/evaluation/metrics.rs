//! Pooled regression and classification metrics over the test records.
//!
//! Regression metrics are on simple excess returns (`exp(log) - 1`) unless
//! named `scaled_*`. Classification metrics only see records with a defined
//! label.

use super::EvaluationRecord;
use crate::stats;
use serde::{Deserialize, Serialize};

/// MAPE ignores realized values at or below this magnitude.
const MAPE_MIN_ABS: f64 = 1e-6;

// ============================================================================
// Regression
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub n_samples: usize,
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,

    /// Percent; `None` when no realized value exceeds the floor
    pub mape: Option<f64>,

    /// Share of records where predicted and realized signs agree
    pub direction_accuracy: f64,

    /// MAE between scaled prediction and scaled target
    pub scaled_mae: f64,

    /// Pooled Pearson correlation
    pub pearson_ic: Option<f64>,

    /// Pooled Spearman correlation
    pub spearman_ic: Option<f64>,
}

impl RegressionMetrics {
    pub fn compute(records: &[EvaluationRecord]) -> Self {
        let y_true: Vec<f64> = records.iter().map(|r| r.realized_excess).collect();
        let y_pred: Vec<f64> = records.iter().map(|r| r.predicted_excess).collect();
        let s_true: Vec<f64> = records.iter().map(|r| r.realized_scaled).collect();
        let s_pred: Vec<f64> = records.iter().map(|r| r.predicted_scaled).collect();

        let mse = mean_squared_error(&y_true, &y_pred);
        let direction_hits = y_true
            .iter()
            .zip(&y_pred)
            .filter(|(t, p)| sign(**t) == sign(**p))
            .count();

        Self {
            n_samples: records.len(),
            mse,
            mae: mean_absolute_error(&y_true, &y_pred),
            rmse: mse.sqrt(),
            r2: r_squared(&y_true, &y_pred),
            mape: mape(&y_true, &y_pred),
            direction_accuracy: ratio(direction_hits, records.len()),
            scaled_mae: mean_absolute_error(&s_true, &s_pred),
            pearson_ic: stats::pearson(&y_true, &y_pred),
            spearman_ic: stats::spearman(&y_true, &y_pred),
        }
    }
}

/// Error of a constant baseline, for comparison against the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub scaled_mae: f64,
}

impl BaselineMetrics {
    /// `baseline_excess` and `baseline_scaled` are per-record baseline outputs.
    pub fn compute(
        records: &[EvaluationRecord],
        baseline_excess: &[f64],
        baseline_scaled: &[f64],
    ) -> Self {
        let y_true: Vec<f64> = records.iter().map(|r| r.realized_excess).collect();
        let s_true: Vec<f64> = records.iter().map(|r| r.realized_scaled).collect();
        Self {
            mae: mean_absolute_error(&y_true, baseline_excess),
            rmse: mean_squared_error(&y_true, baseline_excess).sqrt(),
            scaled_mae: mean_absolute_error(&s_true, baseline_scaled),
        }
    }
}

fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let errs: Vec<f64> = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).collect();
    stats::mean(&errs).unwrap_or(f64::NAN)
}

fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let errs: Vec<f64> = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).collect();
    stats::mean(&errs).unwrap_or(f64::NAN)
}

/// `1 - SS_res / SS_tot`; a constant target scores 1.0 if matched exactly, else 0.0.
fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let Some(m) = stats::mean(y_true) else {
        return f64::NAN;
    };
    let ss_tot: f64 = y_true.iter().map(|t| (t - m).powi(2)).sum();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn mape(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let pct: Vec<f64> = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, _)| t.abs() > MAPE_MIN_ABS)
        .map(|(t, p)| ((t - p) / t).abs())
        .collect();
    stats::mean(&pct).map(|m| m * 100.0)
}

#[inline]
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

#[inline]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Count outcomes with `prob >= threshold` as the positive call.
    pub fn at_threshold(labels: &[bool], probs: &[f64], threshold: f64) -> Self {
        let mut cm = Self::default();
        for (&actual, &p) in labels.iter().zip(probs) {
            match (actual, p >= threshold) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Zero when nothing was called positive.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Zero when there are no positives.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Labeled test records
    pub n_samples: usize,

    pub accuracy_at_half: f64,

    /// `None` with a single class
    pub auc: Option<f64>,

    /// Threshold chosen on validation
    pub threshold: f64,

    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    /// `None` when no test record carries a label.
    pub fn compute(records: &[EvaluationRecord], threshold: f64) -> Option<Self> {
        let (labels, probs): (Vec<bool>, Vec<f64>) = records
            .iter()
            .filter(|r| r.cls_weight > 0.0)
            .filter_map(|r| r.cls_label.map(|l| (l == 1, r.predicted_probability)))
            .unzip();
        if labels.is_empty() {
            return None;
        }

        let at_half = ConfusionMatrix::at_threshold(&labels, &probs, 0.5);
        let confusion = ConfusionMatrix::at_threshold(&labels, &probs, threshold);

        Some(Self {
            n_samples: labels.len(),
            accuracy_at_half: at_half.accuracy(),
            auc: super::threshold::roc_auc(&labels, &probs),
            threshold,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
        })
    }
}

//! Decision threshold selection on the validation partition.
//!
//! The ROC curve is traced over thresholds `+inf` followed by every distinct
//! predicted probability in descending order; a sample is called positive when
//! `prob >= threshold`. The selected threshold maximises Youden's J
//! (`TPR - FPR`), first maximiser wins.
//!
//! Samples with a non-finite probability are dropped before the curve is
//! built. When only one class remains (or nothing is labeled) no curve can be
//! formed and the configured default is used instead.

use crate::model::Prediction;
use crate::sequence_builder::Sequence;
use serde::{Deserialize, Serialize};

/// One point on the ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: f64,
    pub tpr: f64,
    pub fpr: f64,
}

impl RocPoint {
    #[inline]
    pub fn youden_j(&self) -> f64 {
        self.tpr - self.fpr
    }
}

/// Pairs whose probability is finite, plus the number dropped.
fn finite_pairs(labels: &[bool], probs: &[f64]) -> (Vec<bool>, Vec<f64>, usize) {
    let (kept_labels, kept_probs): (Vec<bool>, Vec<f64>) = labels
        .iter()
        .zip(probs)
        .filter(|(_, p)| p.is_finite())
        .map(|(&l, &p)| (l, p))
        .unzip();
    let dropped = labels.len().min(probs.len()) - kept_labels.len();
    (kept_labels, kept_probs, dropped)
}

/// ROC curve of `probs` against binary `labels`.
///
/// Non-finite probabilities are ignored. Returns an empty curve when either
/// class is missing.
pub fn roc_curve(labels: &[bool], probs: &[f64]) -> Vec<RocPoint> {
    if labels.len() != probs.len() {
        return Vec::new();
    }
    let (labels, probs, _) = finite_pairs(labels, probs);
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut curve = Vec::with_capacity(probs.len() + 1);
    curve.push(RocPoint {
        threshold: f64::INFINITY,
        tpr: 0.0,
        fpr: 0.0,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = probs[order[i]];
        // consume every sample tied at this probability
        while i < order.len() && probs[order[i]] == threshold {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        curve.push(RocPoint {
            threshold,
            tpr: tp as f64 / positives as f64,
            fpr: fp as f64 / negatives as f64,
        });
    }
    curve
}

/// Area under the ROC curve (Mann-Whitney form, ties count one half).
///
/// Non-finite probabilities are ignored. `None` when either class is missing.
pub fn roc_auc(labels: &[bool], probs: &[f64]) -> Option<f64> {
    if labels.len() != probs.len() {
        return None;
    }
    let (labels, probs, _) = finite_pairs(labels, probs);
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let ranks = crate::stats::average_ranks(&probs);
    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(&labels)
        .filter(|(_, &l)| l)
        .map(|(r, _)| r)
        .sum();
    let p = positives as f64;
    Some((pos_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Outcome of threshold selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelection {
    /// Decision threshold (`prob >= threshold` is positive)
    pub threshold: f64,

    /// TPR at the threshold, `None` on fallback
    pub tpr: Option<f64>,

    /// FPR at the threshold, `None` on fallback
    pub fpr: Option<f64>,

    /// Labeled samples the selection was made on
    pub n_samples: usize,

    /// Samples dropped for a non-finite probability
    #[serde(default)]
    pub n_non_finite: usize,

    /// True when the default threshold was used
    pub fallback: bool,
}

/// Youden-J threshold optimiser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdOptimizer {
    default_threshold: f64,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ThresholdOptimizer {
    pub fn new(default_threshold: f64) -> Self {
        Self { default_threshold }
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Select a threshold from binary labels and probabilities.
    pub fn select(&self, labels: &[bool], probs: &[f64]) -> ThresholdSelection {
        let (labels, probs, n_non_finite) = finite_pairs(labels, probs);
        if n_non_finite > 0 {
            log::warn!("Ignoring {n_non_finite} validation samples with a non-finite probability");
        }
        let curve = roc_curve(&labels, &probs);

        let mut best: Option<RocPoint> = None;
        for point in &curve {
            match best {
                Some(b) if point.youden_j() <= b.youden_j() => {}
                _ => best = Some(*point),
            }
        }

        match best {
            Some(point) => {
                log::info!(
                    "Youden threshold {:.4} (TPR {:.3}, FPR {:.3}) on {} validation samples",
                    point.threshold,
                    point.tpr,
                    point.fpr,
                    labels.len()
                );
                ThresholdSelection {
                    threshold: point.threshold,
                    tpr: Some(point.tpr),
                    fpr: Some(point.fpr),
                    n_samples: labels.len(),
                    n_non_finite,
                    fallback: false,
                }
            }
            None => {
                log::warn!(
                    "Validation set has {} labeled samples with a single class; using default threshold {}",
                    labels.len(),
                    self.default_threshold
                );
                ThresholdSelection {
                    threshold: self.default_threshold,
                    tpr: None,
                    fpr: None,
                    n_samples: labels.len(),
                    n_non_finite,
                    fallback: true,
                }
            }
        }
    }

    /// Select a threshold from validation sequences and their predictions.
    ///
    /// Only sequences with a defined classification label take part.
    pub fn fit(&self, sequences: &[Sequence], predictions: &[Prediction]) -> ThresholdSelection {
        let (labels, probs): (Vec<bool>, Vec<f64>) = sequences
            .iter()
            .zip(predictions)
            .filter_map(|(s, p)| s.cls_label.map(|l| (l.as_int() == 1, p.probability)))
            .unzip();
        self.select(&labels, &probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        let labels = [false, false, true, true, false, true];
        let probs = [0.1, 0.3, 0.7, 0.9, 0.2, 0.8];
        let sel = ThresholdOptimizer::default().select(&labels, &probs);
        assert!(!sel.fallback);
        assert_eq!(sel.tpr, Some(1.0));
        assert_eq!(sel.fpr, Some(0.0));
        assert_eq!(sel.threshold, 0.7);

        // every positive at or above, every negative below
        for (l, p) in labels.iter().zip(&probs) {
            assert_eq!(*p >= sel.threshold, *l);
        }
    }

    #[test]
    fn test_single_class_fallback() {
        let sel = ThresholdOptimizer::new(0.5).select(&[true, true], &[0.2, 0.9]);
        assert!(sel.fallback);
        assert_eq!(sel.threshold, 0.5);
        assert_eq!(sel.tpr, None);

        let empty = ThresholdOptimizer::new(0.5).select(&[], &[]);
        assert!(empty.fallback);
        assert_eq!(empty.n_samples, 0);
    }

    #[test]
    fn test_roc_curve_with_ties() {
        let curve = roc_curve(&[true, false, true, false], &[0.8, 0.8, 0.4, 0.1]);
        assert_eq!(curve.len(), 4);
        assert!(curve[0].threshold.is_infinite());
        assert_eq!(curve[1].threshold, 0.8);
        assert_eq!((curve[1].tpr, curve[1].fpr), (0.5, 0.5));
        assert_eq!((curve[3].tpr, curve[3].fpr), (1.0, 1.0));
    }

    #[test]
    fn test_nan_probability_is_ignored() {
        let sel = ThresholdOptimizer::default().select(&[true, false, true], &[0.9, f64::NAN, 0.2]);
        assert_eq!(sel.n_non_finite, 1);
        assert_eq!(sel.n_samples, 2);
        // only positives remain
        assert!(sel.fallback);

        let labels = [true, false, true, false, false];
        let probs = [0.9, f64::NAN, 0.8, f64::INFINITY, 0.1];
        let sel = ThresholdOptimizer::default().select(&labels, &probs);
        assert_eq!(sel.n_non_finite, 2);
        assert!(!sel.fallback);
        assert_eq!(sel.threshold, 0.8);
        assert_eq!((sel.tpr, sel.fpr), (Some(1.0), Some(0.0)));

        let curve = roc_curve(&labels, &probs);
        assert_eq!(curve.len(), 4);
        assert!(curve.iter().skip(1).all(|p| p.threshold.is_finite()));
        assert_eq!(roc_auc(&labels, &probs), Some(1.0));
    }

    #[test]
    fn test_auc() {
        assert_eq!(roc_auc(&[false, true], &[0.1, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&[true, false], &[0.1, 0.9]), Some(0.0));
        assert_eq!(roc_auc(&[true, false], &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[true, true], &[0.5, 0.6]), None);

        let auc = roc_auc(&[false, true, false, true], &[0.1, 0.4, 0.5, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }
}

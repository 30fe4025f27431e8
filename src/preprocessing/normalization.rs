//! Standardisation fit on the training partition.
//!
//! ```text
//! normalized = (x - mean) / std
//! ```
//!
//! `mean` and `std` are per column, computed once over the training rows
//! (population std, ddof = 0) and applied unchanged to every partition.
//! A column with zero spread is scaled by 1 so that constant features map to 0
//! instead of NaN.
//!
//! # Architecture
//!
//! ```text
//! StandardScaler (per-column mean/std)
//!     ├── FeatureScaler  (24 model features)
//!     └── TargetScaler   (target_excess_log, single column)
//!
//! FittedScalers = FeatureScaler + TargetScaler, fit once on train
//! ```
//!
//! # Usage
//!
//! ```
//! use excess_return_pipeline::preprocessing::StandardScaler;
//!
//! let train = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
//! let scaler = StandardScaler::fit(&train).unwrap();
//!
//! let z = scaler.transform_row(&[3.0, 10.0]).unwrap();
//! assert_eq!(z, vec![1.0, 0.0]);
//! assert_eq!(scaler.inverse_transform_row(&z).unwrap(), vec![3.0, 10.0]);
//! ```

use crate::error::{PipelineError, Result};
use crate::schema::{LabeledRow, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Per-column z-score scaler with frozen parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means
    means: Vec<f64>,

    /// Column scales (population std, or 1.0 where std is 0)
    scales: Vec<f64>,

    /// Rows seen during fit
    n_samples: usize,
}

impl StandardScaler {
    /// Fit on a row-major matrix. All rows must have the same width.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| PipelineError::Scaler("cannot fit on zero rows".to_string()))?;
        let width = first.as_ref().len();
        if width == 0 {
            return Err(PipelineError::Scaler("cannot fit on zero columns".to_string()));
        }

        let n = rows.len() as f64;
        let mut sums = vec![0.0; width];
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(PipelineError::FeatureCountMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (s, v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        let means: Vec<f64> = sums.iter().map(|s| s / n).collect();

        let mut sq = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in sq.iter_mut().zip(row.as_ref()).zip(&means) {
                *acc += (v - m).powi(2);
            }
        }
        let scales = sq
            .iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std == 0.0 || !std.is_finite() {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self {
            means,
            scales,
            n_samples: rows.len(),
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn check_width(&self, len: usize) -> Result<()> {
        if len != self.width() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: self.width(),
                actual: len,
            });
        }
        Ok(())
    }

    /// `(x - mean) / scale` per column.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// `z * scale + mean` per column.
    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }
}

// =============================================================================
// Feature / target wrappers
// =============================================================================

/// Scaler over the model feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    inner: StandardScaler,
}

impl FeatureScaler {
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> Result<Self> {
        Ok(Self {
            inner: StandardScaler::fit(rows)?,
        })
    }

    pub fn transform(&self, row: &[f64; FEATURE_COUNT]) -> Result<Vec<f64>> {
        self.inner.transform_row(row)
    }

    pub fn inverse_transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.inner.inverse_transform_row(row)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.inner
    }
}

/// Single-column scaler over `target_excess_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    mean: f64,
    scale: f64,
    n_samples: usize,
}

impl TargetScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        let column: Vec<[f64; 1]> = values.iter().map(|v| [*v]).collect();
        let inner = StandardScaler::fit(&column)?;
        Ok(Self {
            mean: inner.means[0],
            scale: inner.scales[0],
            n_samples: inner.n_samples,
        })
    }

    #[inline]
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    #[inline]
    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

/// Feature and target scalers fit together on the training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScalers {
    pub features: FeatureScaler,
    pub target: TargetScaler,
}

impl FittedScalers {
    /// Fit both scalers on training rows only.
    pub fn fit(train: &[LabeledRow]) -> Result<Self> {
        let matrix: Vec<[f64; FEATURE_COUNT]> = train.iter().map(|r| r.feature_vector()).collect();
        let targets: Vec<f64> = train.iter().map(|r| r.target_excess_log).collect();
        let scalers = Self {
            features: FeatureScaler::fit(&matrix)?,
            target: TargetScaler::fit(&targets)?,
        };
        log::info!(
            "Fitted scalers on {} training rows (target mean {:.6}, scale {:.6})",
            train.len(),
            scalers.target.mean(),
            scalers.target.scale()
        );
        Ok(scalers)
    }

    /// Scaled feature vector of a row.
    pub fn scale_row(&self, row: &LabeledRow) -> Result<Vec<f64>> {
        self.features.transform(&row.feature_vector())
    }
}

//! Dense tensor view of a slice of sequences.
//!
//! ```text
//! features:     [N, T, F]  f64
//! entity_index: [N]        embedding keys
//! ```
//!
//! This is the input shape handed to a [`crate::model::Predictor`].

use super::Sequence;
use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use ndarray::Array3;

/// Batched sequences plus the per-sample keys needed to join predictions back.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    /// `[N, T, F]` scaled features
    pub features: Array3<f64>,

    /// Dense entity index per sample
    pub entity_index: Vec<usize>,

    /// Entity id per sample
    pub entity_ids: Vec<String>,

    /// Window end date per sample
    pub base_dates: Vec<NaiveDate>,
}

impl SequenceBatch {
    /// Stack sequences into one tensor. All windows must share `T` and `F`.
    pub fn from_sequences(sequences: &[Sequence]) -> Result<Self> {
        let n = sequences.len();
        let t = sequences.first().map(|s| s.len()).unwrap_or(0);
        let f = sequences
            .first()
            .and_then(|s| s.features.first())
            .map(|v| v.len())
            .unwrap_or(0);

        let mut flat = Vec::with_capacity(n * t * f);
        for seq in sequences {
            if seq.len() != t {
                return Err(PipelineError::config(format!(
                    "mixed window lengths in batch: {} vs {}",
                    seq.len(),
                    t
                )));
            }
            for step in &seq.features {
                if step.len() != f {
                    return Err(PipelineError::FeatureCountMismatch {
                        expected: f,
                        actual: step.len(),
                    });
                }
                flat.extend_from_slice(step);
            }
        }

        Ok(Self {
            features: Array3::from_shape_vec((n, t, f), flat)?,
            entity_index: sequences.iter().map(|s| s.entity_index).collect(),
            entity_ids: sequences.iter().map(|s| s.entity_id.clone()).collect(),
            base_dates: sequences.iter().map(|s| s.base_date).collect(),
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.entity_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_index.is_empty()
    }

    /// `(N, T, F)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.features.dim()
    }
}

//! Error types for the excess-return pipeline.
//!
//! Every fallible stage returns [`Result<T>`], an alias over [`PipelineError`].
//! Conditions the pipeline treats as recoverable (a date with too few entities,
//! single-class validation data) never surface here; they are skipped and
//! counted in the stage diagnostics instead.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input panel contained no usable rows.
    #[error("input panel is empty: {0}")]
    EmptyPanel(String),

    /// The training partition produced no sequences, so nothing can be fit.
    #[error(
        "training partition produced zero sequences ({train_rows} rows across {entities} entities, \
         window size {window_size}): {hint}"
    )]
    NoTrainingSequences {
        /// Rows in the training partition
        train_rows: usize,
        /// Distinct entities in the training partition
        entities: usize,
        /// Configured sequence length T
        window_size: usize,
        /// Likely cause
        hint: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A date could not be normalised to a calendar date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A feature vector or matrix had the wrong width.
    #[error("feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch {
        /// Expected width
        expected: usize,
        /// Actual width
        actual: usize,
    },

    /// A scaler was applied before being fit, or fit on no data.
    #[error("scaler error: {0}")]
    Scaler(String),

    /// The external predictor failed or broke its output contract.
    #[error("predictor error: {0}")]
    Predictor(String),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// JSON (de)serialisation error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialisation error.
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    /// NumPy write error.
    #[error(transparent)]
    Npy(#[from] ndarray_npy::WriteNpyError),

    /// ndarray shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// Rayon pool construction error.
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// Build an [`PipelineError::InvalidConfig`] from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_training_sequences_message_is_diagnosable() {
        let err = PipelineError::NoTrainingSequences {
            train_rows: 12,
            entities: 3,
            window_size: 15,
            hint: "insufficient history per entity".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("12 rows"));
        assert!(msg.contains("window size 15"));
        assert!(msg.contains("insufficient history"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}

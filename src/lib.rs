//! Excess-Return Pipeline
//!
//! Cross-sectional excess-return forecasting data pipeline for daily equity
//! panels.
//!
//! # Overview
//!
//! This library turns a daily `(entity, date)` price/volume panel into
//! leakage-free training sequences for a sequence model, and scores that
//! model's out-of-sample predictions:
//!
//! - **Indicators**: per-entity trailing technical indicators (MA, RSI, MACD,
//!   returns, volatility, volume z-score, turnover)
//! - **Labels**: H-period forward log return minus the same-date market mean,
//!   bounded, plus per-date top/bottom percentile classes
//! - **Sequences**: T-step windows scaled with train-fit statistics only
//! - **Evaluation**: regression/classification metrics, daily IC with
//!   period aggregates, long-short spreads and prediction-bucket returns
//!
//! The model itself is external; it plugs in through [`model::Predictor`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Excess-Return Pipeline                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ingest/          - CSV panel loading and date normalisation    │
//! │  features/        - Per-entity technical indicators             │
//! │  labeling/        - Horizon targets and percentile classes      │
//! │  preprocessing/   - Cross-sectional excess, filter, scalers     │
//! │  split            - Chronological train / validation / test     │
//! │  sequence_builder/- Fixed-length windows and batches            │
//! │  model            - Predictor seam                              │
//! │  evaluation/      - Metrics, IC, long-short, buckets            │
//! │  export/          - NumPy datasets and CSV / JSON reports       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::load_toml("experiment.toml")?)?;
//! let dataset = pipeline.prepare_csv("panel.csv")?;
//! DatasetExporter::new("dataset/").export(&dataset, pipeline.config())?;
//!
//! let predictor = FilePredictor::from_csv_path("predictions.csv")?;
//! let report = pipeline.evaluate(&dataset, &predictor)?;
//! ReportWriter::new("report/").write(&report)?;
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod features;
pub mod ingest;
pub mod labeling;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod schema;
pub mod sequence_builder;
pub mod split;
pub mod stats;
pub mod validation;

// Re-exports - Errors
pub use error::{PipelineError, Result};

// Re-exports - Schema
pub use schema::{
    EntityIndex, FeatureCategory, FeatureDef, FeatureRow, FeatureSchema, Indicators, LabeledRow,
    ObservationRow, FEATURE_COUNT, FEATURE_NAMES,
};

// Re-exports - Config
pub use config::{ExperimentMetadata, PipelineConfig};

// Re-exports - Ingest
pub use ingest::{IngestStats, IngestedPanel, PanelLoader};

// Re-exports - Features
pub use features::{IndicatorConfig, IndicatorEngine};

// Re-exports - Labeling
pub use labeling::{ClassLabel, LabelConfig, LabelConstructor, LabelStats, TieBreak};

// Re-exports - Preprocessing
pub use preprocessing::{
    CrossSectionalNormalizer, FilterConfig, FittedScalers, LiquidityFilter, TargetScaler,
};

// Re-exports - Split
pub use split::{BoundaryMode, PartitionedPanel, Partitioner, SplitConfig};

// Re-exports - Sequence Building
pub use sequence_builder::{Sequence, SequenceBatch, SequenceBuilder, SequenceConfig};

// Re-exports - Model
pub use model::{FilePredictor, MeanBaselinePredictor, Prediction, Predictor};

// Re-exports - Evaluation
pub use evaluation::{EvaluationConfig, EvaluationRecord, EvaluationReport, Evaluator};

// Re-exports - Export
pub use export::{DatasetExporter, ReportWriter};

// Re-exports - Validation
pub use validation::{ValidationLevel, ValidationResult};

// Re-exports - Pipeline
pub use pipeline::{Pipeline, PrepareStats, PreparedDataset};

//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use excess_return_pipeline::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let dataset = pipeline.prepare_csv("panel.csv")?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`], [`PipelineConfig`], [`PreparedDataset`], [`PrepareStats`]
//!
//! ## Stages
//! - [`PanelLoader`], [`IndicatorEngine`], [`LabelConstructor`],
//!   [`CrossSectionalNormalizer`], [`LiquidityFilter`], [`Partitioner`],
//!   [`SequenceBuilder`]
//!
//! ## Model seam
//! - [`Predictor`], [`Prediction`], [`FilePredictor`], [`MeanBaselinePredictor`]
//!
//! ## Evaluation and export
//! - [`Evaluator`], [`EvaluationReport`], [`DatasetExporter`], [`ReportWriter`]

// ============================================================================
// Core Pipeline
// ============================================================================

pub use crate::config::{ExperimentMetadata, PipelineConfig};
pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{Pipeline, PrepareStats, PreparedDataset};

// ============================================================================
// Stages
// ============================================================================

pub use crate::features::{IndicatorConfig, IndicatorEngine};
pub use crate::ingest::{IngestedPanel, PanelLoader};
pub use crate::labeling::{ClassLabel, LabelConfig, LabelConstructor, TieBreak};
pub use crate::preprocessing::{CrossSectionalNormalizer, FilterConfig, FittedScalers, LiquidityFilter};
pub use crate::schema::{EntityIndex, LabeledRow, ObservationRow, FEATURE_COUNT, FEATURE_NAMES};
pub use crate::sequence_builder::{Sequence, SequenceBatch, SequenceBuilder, SequenceConfig};
pub use crate::split::{BoundaryMode, PartitionedPanel, Partitioner, SplitConfig};

// ============================================================================
// Model
// ============================================================================

pub use crate::model::{FilePredictor, MeanBaselinePredictor, Prediction, Predictor};

// ============================================================================
// Evaluation and Export
// ============================================================================

pub use crate::evaluation::{EvaluationConfig, EvaluationReport, Evaluator};
pub use crate::export::{DatasetExporter, ReportWriter};
pub use crate::validation::{ValidationLevel, ValidationResult};

//! Sequence generation for the sequence model.
//!
//! The predictor consumes windows of T consecutive scaled feature rows of one
//! entity together with the entity's embedding index.
//!
//! # Architecture
//!
//! - **SequenceBuilder**: per-entity sliding windows over a partition
//! - **SequenceConfig**: window size and stride
//! - **Sequence**: one window and the labels of its last row
//! - **SequenceBatch**: `[N, T, F]` tensor view for prediction and export
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::sequence_builder::{SequenceBatch, SequenceBuilder, SequenceConfig};
//!
//! let builder = SequenceBuilder::new(SequenceConfig::new(15, 1));
//! let (sequences, stats) = builder.build(&train_rows, &scalers, &entity_index)?;
//! let batch = SequenceBatch::from_sequences(&sequences[..256])?;
//! ```

mod batch;
mod builder;

// Re-export all public types
pub use batch::SequenceBatch;
pub use builder::{FeatureVec, Sequence, SequenceBuilder, SequenceConfig, SequenceStats};

//! End-to-end pipeline: raw panel → prepared sequences → evaluation report.
//!
//! # Architecture
//!
//! ```text
//! IngestedPanel (ObservationRow, sorted, gap-filled)
//!      │
//!      ▼  IndicatorEngine            per entity, rayon
//! FeatureRow
//!      │
//!      ▼  LabelConstructor::forward_targets      target_log, tail rows dropped
//!      ▼  CrossSectionalNormalizer::excess_targets   market mean, target_excess_log
//!      ▼  LabelConstructor::bound_excess          discard |x| >= 1.0, clip ±0.4
//!      ▼  CrossSectionalNormalizer::excess_returns   xret_1d, xret_5d
//!      ▼  LiquidityFilter + drop_incomplete
//!      ▼  LabelConstructor::assign_classes        per-date percentile labels
//! LabeledRow
//!      │
//!      ▼  Partitioner                (date, entity) order, 80/20 then 90/10
//!      ▼  FittedScalers::fit(train)
//!      ▼  SequenceBuilder            per entity, rayon
//! PreparedDataset { train, validation, test, latest }
//!      │
//!      ▼  Predictor (external) + Evaluator
//! EvaluationReport
//! ```
//!
//! Every stage consumes the previous table and returns a new one. The only
//! fitted state (scalers, decision threshold) is fit once on train or
//! validation and read-only afterwards.
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let dataset = pipeline.prepare_csv("panel.csv")?;
//!
//! let report = pipeline.evaluate(&dataset, &my_model)?;
//! report.log_summary();
//! ```
//!
//! # Fatal conditions
//!
//! | Condition | Error |
//! |-----------|-------|
//! | no input rows, or nothing survives labeling | `EmptyPanel` |
//! | training partition yields no sequences | `NoTrainingSequences` |

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::features::IndicatorEngine;
use crate::ingest::{IngestStats, IngestedPanel, PanelLoader};
use crate::labeling::{LabelConstructor, LabelStats};
use crate::model::{latest_forecasts, predict_in_batches, MeanBaselinePredictor, Predictor};
use crate::preprocessing::{drop_incomplete, CrossSectionalNormalizer, FittedScalers, LiquidityFilter};
use crate::schema::{EntityIndex, LabeledRow, ObservationRow};
use crate::sequence_builder::{Sequence, SequenceBuilder, SequenceStats};
use crate::split::{PartitionedPanel, Partitioner};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Below this many training sequences a warning is logged.
pub const MIN_RECOMMENDED_TRAIN_SEQUENCES: usize = 200;

/// Row counts through every preparation stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareStats {
    /// Present when the panel came through [`PanelLoader`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,

    pub observation_rows: usize,
    pub entities: usize,

    /// Rows without a value H periods ahead
    pub horizon_dropped: usize,

    pub outliers_discarded: usize,
    pub clipped: usize,
    pub liquidity_dropped: usize,

    /// Rows with a non-finite model feature (warm-up)
    pub incomplete_dropped: usize,

    pub labeled_rows: usize,
    pub labels: LabelStats,

    pub train_rows: usize,
    pub validation_rows: usize,
    pub test_rows: usize,

    pub train_sequences: SequenceStats,
    pub validation_sequences: SequenceStats,
    pub test_sequences: SequenceStats,

    /// Entities with a latest forecast window
    pub latest_windows: usize,
}

/// Output of [`Pipeline::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub partitions: PartitionedPanel,
    pub scalers: FittedScalers,
    pub entity_index: EntityIndex,
    pub train: Vec<Sequence>,
    pub validation: Vec<Sequence>,
    pub test: Vec<Sequence>,

    /// Most recent window per entity, for forward forecasts
    pub latest: Vec<Sequence>,

    pub stats: PrepareStats,
}

/// Configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    pool: Option<std::sync::Arc<rayon::ThreadPool>>,
}

impl Pipeline {
    /// Validate the configuration and build the worker pool.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.num_threads {
            Some(n) => Some(std::sync::Arc::new(
                rayon::ThreadPoolBuilder::new().num_threads(n).build()?,
            )),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn run<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Load a CSV panel and prepare it.
    pub fn prepare_csv<P: AsRef<Path>>(&self, path: P) -> Result<PreparedDataset> {
        let panel = PanelLoader::from_csv_path(path)?;
        self.prepare(panel)
    }

    /// Prepare an ingested panel.
    pub fn prepare(&self, panel: IngestedPanel) -> Result<PreparedDataset> {
        let mut dataset = self.prepare_rows(panel.rows)?;
        dataset.stats.ingest = Some(panel.stats);
        Ok(dataset)
    }

    /// Prepare already-normalised observations.
    pub fn prepare_rows(&self, observations: Vec<ObservationRow>) -> Result<PreparedDataset> {
        if observations.is_empty() {
            return Err(PipelineError::EmptyPanel("no observation rows".to_string()));
        }
        let panel_check = validation::validate_panel(&observations);
        panel_check.log("panel");

        let mut stats = PrepareStats {
            observation_rows: observations.len(),
            entities: observations
                .iter()
                .map(|r| r.entity_id.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
            ..Default::default()
        };

        let rows = self.label_panel(&observations, &mut stats)?;
        drop(observations);

        let entity_index = EntityIndex::from_ids(rows.iter().map(|r| r.entity_id()));
        let partitions = Partitioner::new(self.config.split.clone()).split(rows);
        stats.train_rows = partitions.train.len();
        stats.validation_rows = partitions.validation.len();
        stats.test_rows = partitions.test.len();
        validation::validate_partitions(&partitions).log("partitions");

        if partitions.train.is_empty() {
            return Err(self.no_training_sequences(&partitions.train, "training partition is empty"));
        }
        let scalers = FittedScalers::fit(&partitions.train)?;

        let builder = SequenceBuilder::new(self.config.sequence.clone());
        let (train, train_stats) =
            self.run(|| builder.build(&partitions.train, &scalers, &entity_index))?;
        if train.is_empty() {
            return Err(self.no_training_sequences(
                &partitions.train,
                "no entity has more than window_size rows in the training partition; \
                 lower window_size or relax the liquidity filter",
            ));
        }
        if train.len() < MIN_RECOMMENDED_TRAIN_SEQUENCES {
            log::warn!(
                "Only {} training sequences (recommended >= {}); results will be noisy",
                train.len(),
                MIN_RECOMMENDED_TRAIN_SEQUENCES
            );
        }

        let (validation, validation_stats) =
            self.run(|| builder.build(&partitions.validation, &scalers, &entity_index))?;
        let (test, test_stats) = self.run(|| builder.build(&partitions.test, &scalers, &entity_index))?;

        let latest = self.run(|| {
            builder.build_latest(
                partitions
                    .train
                    .iter()
                    .chain(&partitions.validation)
                    .chain(&partitions.test),
                &scalers,
                &entity_index,
            )
        })?;

        stats.train_sequences = train_stats;
        stats.validation_sequences = validation_stats;
        stats.test_sequences = test_stats;
        stats.latest_windows = latest.len();

        log::info!(
            "Sequences: train {}, validation {}, test {} (T = {}), latest windows {}",
            train.len(),
            validation.len(),
            test.len(),
            self.config.sequence.window_size,
            latest.len()
        );

        Ok(PreparedDataset {
            partitions,
            scalers,
            entity_index,
            train,
            validation,
            test,
            latest,
            stats,
        })
    }

    /// Indicators through classification labels.
    fn label_panel(&self, observations: &[ObservationRow], stats: &mut PrepareStats) -> Result<Vec<LabeledRow>> {
        let engine = IndicatorEngine::new(self.config.indicators.clone());
        let labels = LabelConstructor::new(self.config.labels.clone());
        let normalizer = CrossSectionalNormalizer;

        let features = self.run(|| engine.compute_panel(observations));
        log::info!("Computed indicators for {} rows", features.len());

        let (rows, horizon_dropped) = labels.forward_targets(features);
        let rows = normalizer.excess_targets(rows);
        let (rows, outliers, clipped) = labels.bound_excess(rows);
        let rows = normalizer.excess_returns(rows);

        let (rows, liquidity_dropped) = LiquidityFilter::new(self.config.filter.clone()).apply(rows);
        let (rows, incomplete_dropped) = drop_incomplete(rows);
        let (rows, dates_ranked) = labels.assign_classes(rows);

        log::info!(
            "Labeling: {} horizon-dropped, {} outliers, {} clipped, {} illiquid, {} incomplete, {} rows kept",
            horizon_dropped,
            outliers,
            clipped,
            liquidity_dropped,
            incomplete_dropped,
            rows.len()
        );

        stats.horizon_dropped = horizon_dropped;
        stats.outliers_discarded = outliers;
        stats.clipped = clipped;
        stats.liquidity_dropped = liquidity_dropped;
        stats.incomplete_dropped = incomplete_dropped;
        stats.labeled_rows = rows.len();
        stats.labels = LabelStats {
            outliers_discarded: outliers,
            clipped,
            dates_ranked,
            ..LabelStats::from_rows(&rows)
        };

        if rows.is_empty() {
            return Err(PipelineError::EmptyPanel(format!(
                "no rows survived labeling ({} without horizon, {} outliers, {} illiquid, {} incomplete)",
                horizon_dropped, outliers, liquidity_dropped, incomplete_dropped
            )));
        }
        validation::validate_features(&rows).log("features");
        Ok(rows)
    }

    fn no_training_sequences(&self, train: &[LabeledRow], hint: &str) -> PipelineError {
        PipelineError::NoTrainingSequences {
            train_rows: train.len(),
            entities: train
                .iter()
                .map(|r| r.entity_id())
                .collect::<BTreeSet<_>>()
                .len(),
            window_size: self.config.sequence.window_size,
            hint: hint.to_string(),
        }
    }

    /// Evaluate a predictor on a prepared dataset.
    ///
    /// The threshold is fit on validation predictions, then frozen for test.
    /// A [`MeanBaselinePredictor`] fit on the training sequences supplies the
    /// baseline metrics.
    pub fn evaluate(&self, dataset: &PreparedDataset, predictor: &dyn Predictor) -> Result<EvaluationReport> {
        let eval_config = &self.config.evaluation;
        let batch_size = eval_config.batch_size;
        let evaluator = Evaluator::new(eval_config.clone(), self.config.horizon());

        let val_preds = predict_in_batches(predictor, &dataset.validation, batch_size)?;
        let threshold = evaluator.select_threshold(&dataset.validation, &val_preds);

        let test_preds = predict_in_batches(predictor, &dataset.test, batch_size)?;
        let baseline = MeanBaselinePredictor::fit(&dataset.train);
        let baseline_preds = predict_in_batches(&baseline, &dataset.test, batch_size)?;

        let mut report = evaluator.evaluate(
            predictor.name(),
            threshold,
            &dataset.test,
            &test_preds,
            &baseline_preds,
            &dataset.scalers.target,
        );
        report.latest = match latest_forecasts(predictor, &dataset.latest, &dataset.scalers.target, batch_size) {
            Ok(forecasts) => forecasts,
            Err(e) => {
                log::warn!("Latest forecasts unavailable: {e}");
                Vec::new()
            }
        };

        report.log_summary();
        Ok(report)
    }
}

//! Predictor seam.
//!
//! The sequence model itself lives outside this crate. Anything that maps a
//! `[N, T, F]` batch (plus entity indices) to a scaled regression score and an
//! up-probability per sample can drive validation threshold selection, test
//! evaluation and latest forecasts.
//!
//! ```text
//! &[Sequence] ──chunks(batch_size)──▶ SequenceBatch ──Predictor──▶ Vec<Prediction>
//! ```

use crate::error::{PipelineError, Result};
use crate::ingest::{normalize_date, DateValue};
use crate::preprocessing::TargetScaler;
use crate::sequence_builder::{Sequence, SequenceBatch};
use ahash::AHashMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Output for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Score in scaled target space
    pub score: f64,

    /// Probability that the sample is in the top bucket
    pub probability: f64,
}

impl Prediction {
    pub fn new(score: f64, probability: f64) -> Self {
        Self { score, probability }
    }
}

/// Batched predictor.
///
/// Implementations must return exactly one [`Prediction`] per sample, in batch
/// order.
pub trait Predictor: Send + Sync {
    /// Predict a batch.
    fn predict_batch(&self, batch: &SequenceBatch) -> Result<Vec<Prediction>>;

    /// Display name used in logs and reports.
    fn name(&self) -> &str {
        "predictor"
    }
}

/// Run `predictor` over `sequences` in chunks of `batch_size`.
///
/// Fails if the predictor returns the wrong number of outputs for any chunk.
pub fn predict_in_batches(
    predictor: &dyn Predictor,
    sequences: &[Sequence],
    batch_size: usize,
) -> Result<Vec<Prediction>> {
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(sequences.len());

    for chunk in sequences.chunks(batch_size) {
        let batch = SequenceBatch::from_sequences(chunk)?;
        let preds = predictor.predict_batch(&batch)?;
        if preds.len() != chunk.len() {
            return Err(PipelineError::Predictor(format!(
                "{} returned {} predictions for a batch of {}",
                predictor.name(),
                preds.len(),
                chunk.len()
            )));
        }
        out.extend(preds);
    }

    log::debug!(
        "{}: {} predictions in {} batches",
        predictor.name(),
        out.len(),
        sequences.len().div_ceil(batch_size)
    );
    Ok(out)
}

// ============================================================================
// Baseline
// ============================================================================

/// Constant predictor: mean scaled training target, probability 0.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanBaselinePredictor {
    mean_score: f64,
}

impl MeanBaselinePredictor {
    /// Fit on the training sequences' scaled targets.
    pub fn fit(train: &[Sequence]) -> Self {
        let targets: Vec<f64> = train.iter().map(|s| s.target).collect();
        let mean_score = crate::stats::mean(&targets).unwrap_or(0.0);
        Self { mean_score }
    }

    pub fn mean_score(&self) -> f64 {
        self.mean_score
    }
}

impl Predictor for MeanBaselinePredictor {
    fn predict_batch(&self, batch: &SequenceBatch) -> Result<Vec<Prediction>> {
        Ok(vec![Prediction::new(self.mean_score, 0.5); batch.len()])
    }

    fn name(&self) -> &str {
        "mean-baseline"
    }
}

// ============================================================================
// Predictions from file
// ============================================================================

/// One line of an external predictions CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub entity_id: String,

    /// Window end date
    pub date: String,

    /// Score in scaled target space
    pub score: f64,

    pub probability: f64,
}

/// Predictor backed by precomputed `(entity_id, date)` predictions.
///
/// Lets a model trained outside this crate be evaluated by writing one CSV
/// row per exported sequence.
#[derive(Debug, Clone, Default)]
pub struct FilePredictor {
    predictions: AHashMap<(String, NaiveDate), Prediction>,
}

impl FilePredictor {
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read `entity_id,date,score,probability` rows. Later duplicates win.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();
        for row in rdr.deserialize() {
            records.push(row?);
        }
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<PredictionRecord>) -> Result<Self> {
        let mut predictions = AHashMap::with_capacity(records.len());
        for r in records {
            let date = normalize_date(&DateValue::Text(r.date))?;
            predictions.insert((r.entity_id, date), Prediction::new(r.score, r.probability));
        }
        log::info!("Loaded {} external predictions", predictions.len());
        Ok(Self { predictions })
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn get(&self, entity_id: &str, date: NaiveDate) -> Option<Prediction> {
        self.predictions.get(&(entity_id.to_string(), date)).copied()
    }
}

impl Predictor for FilePredictor {
    fn predict_batch(&self, batch: &SequenceBatch) -> Result<Vec<Prediction>> {
        batch
            .entity_ids
            .iter()
            .zip(&batch.base_dates)
            .map(|(entity, date)| {
                self.get(entity, *date).ok_or_else(|| {
                    PipelineError::Predictor(format!("no prediction for {entity} on {date}"))
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ============================================================================
// Latest forecasts
// ============================================================================

/// Forward-looking forecast from an entity's most recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestForecast {
    pub entity_id: String,
    pub last_date: NaiveDate,
    pub last_close: f64,

    /// Simple excess return over the horizon
    pub predicted_excess: f64,

    /// `last_close * (1 + predicted_excess)`
    pub implied_price: f64,

    pub probability: f64,
}

/// Scaled score to simple excess return: `exp(inverse(score)) - 1`.
#[inline]
pub fn score_to_excess(target: &TargetScaler, score: f64) -> f64 {
    target.inverse_transform(score).exp() - 1.0
}

/// Predict each latest window and convert to price space.
pub fn latest_forecasts(
    predictor: &dyn Predictor,
    windows: &[Sequence],
    target: &TargetScaler,
    batch_size: usize,
) -> Result<Vec<LatestForecast>> {
    let preds = predict_in_batches(predictor, windows, batch_size)?;
    Ok(windows
        .iter()
        .zip(preds)
        .map(|(seq, p)| {
            let predicted_excess = score_to_excess(target, p.score);
            LatestForecast {
                entity_id: seq.entity_id.clone(),
                last_date: seq.base_date,
                last_close: seq.last_close,
                predicted_excess,
                implied_price: seq.last_close * (1.0 + predicted_excess),
                probability: p.probability,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seq(entity: &str, target: f64) -> Sequence {
        Sequence {
            entity_id: entity.to_string(),
            entity_index: 0,
            base_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            features: vec![Arc::new(vec![0.0; 2]); 3],
            target,
            target_excess_log: 0.0,
            market_target_log: 0.0,
            last_close: 100.0,
            cls_label: None,
            cls_weight: 0.0,
        }
    }

    struct Broken;

    impl Predictor for Broken {
        fn predict_batch(&self, _batch: &SequenceBatch) -> Result<Vec<Prediction>> {
            Ok(vec![Prediction::new(0.0, 0.5)])
        }
    }

    #[test]
    fn test_baseline_mean() {
        let train = vec![seq("A", 1.0), seq("B", 3.0)];
        let baseline = MeanBaselinePredictor::fit(&train);
        assert_eq!(baseline.mean_score(), 2.0);

        let preds = predict_in_batches(&baseline, &train, 1).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.score == 2.0 && p.probability == 0.5));
    }

    #[test]
    fn test_wrong_output_count_is_error() {
        let seqs = vec![seq("A", 0.0), seq("B", 0.0)];
        let err = predict_in_batches(&Broken, &seqs, 8).unwrap_err();
        assert!(matches!(err, PipelineError::Predictor(_)));
    }

    #[test]
    fn test_file_predictor_lookup() {
        let csv = "entity_id,date,score,probability\nA,20240304,0.7,0.9\nB,2024-03-04,-0.2,0.1\n";
        let predictor = FilePredictor::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(predictor.len(), 2);

        let batch = SequenceBatch::from_sequences(&[seq("A", 0.0), seq("B", 0.0)]).unwrap();
        let preds = predictor.predict_batch(&batch).unwrap();
        assert_eq!(preds[0], Prediction::new(0.7, 0.9));
        assert_eq!(preds[1].probability, 0.1);

        let missing = SequenceBatch::from_sequences(&[seq("C", 0.0)]).unwrap();
        assert!(matches!(predictor.predict_batch(&missing), Err(PipelineError::Predictor(_))));
    }

    #[test]
    fn test_latest_forecast_price() {
        let target = TargetScaler::fit(&[-0.1, 0.1]).unwrap();
        let windows = vec![seq("A", 0.0)];
        // score 1.0 -> log excess 0.1
        let baseline = MeanBaselinePredictor { mean_score: 1.0 };
        let out = latest_forecasts(&baseline, &windows, &target, 16).unwrap();
        let expected = 0.1f64.exp() - 1.0;
        assert!((out[0].predicted_excess - expected).abs() < 1e-12);
        assert!((out[0].implied_price - 100.0 * (1.0 + expected)).abs() < 1e-9);
    }
}

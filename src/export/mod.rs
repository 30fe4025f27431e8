//! Data Export Module
//!
//! Writes prepared sequences as NumPy arrays for model training outside this
//! crate, and evaluation reports as CSV tables plus a JSON summary.
//!
//! # Dataset layout
//!
//! ```text
//! output_dir/
//! ├── train_sequences.npy        [N, T, F] f64, scaled features
//! ├── train_targets.npy          [N]       f64, scaled target_excess_log
//! ├── train_cls_labels.npy       [N]       u8, 0 = bottom, 1 = top, 0 when unlabeled
//! ├── train_cls_weights.npy      [N]       f64, 1.0 iff labeled
//! ├── train_entity_index.npy     [N]       i64, embedding index
//! ├── train_keys.csv             entity_id, base_date per row
//! ├── validation_* / test_* / latest_*
//! ├── metadata.json
//! └── scalers.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::export::DatasetExporter;
//!
//! let dataset = pipeline.prepare_csv("panel.csv")?;
//! DatasetExporter::new("out/").export(&dataset, pipeline.config())?;
//! ```

pub mod report;

pub use report::ReportWriter;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{PrepareStats, PreparedDataset};
use crate::preprocessing::FittedScalers;
use crate::schema::{EntityIndex, FEATURE_COUNT, FEATURE_NAMES, SCHEMA_VERSION};
use crate::sequence_builder::Sequence;
use chrono::NaiveDate;
use ndarray::{Array1, Array3};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Split names in export order.
pub const SPLITS: [&str; 4] = ["train", "validation", "test", "latest"];

/// Per-split summary stored in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub n_sequences: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub n_labeled: usize,
}

impl SplitSummary {
    fn from_sequences(sequences: &[Sequence]) -> Self {
        Self {
            n_sequences: sequences.len(),
            first_date: sequences.iter().map(|s| s.base_date).min(),
            last_date: sequences.iter().map(|s| s.base_date).max(),
            n_labeled: sequences.iter().filter(|s| s.cls_label.is_some()).count(),
        }
    }
}

/// Metadata about an exported dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub schema_version: String,
    pub feature_names: Vec<String>,
    pub n_features: usize,

    /// Sequence length T
    pub window_size: usize,

    /// Forecast horizon H
    pub horizon: usize,

    pub n_entities: usize,
    pub splits: BTreeMap<String, SplitSummary>,
    pub stats: PrepareStats,
    pub config: PipelineConfig,
    pub export_timestamp: String,
}

/// Fitted state needed to invert predictions: scalers and entity index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerExport {
    pub scalers: FittedScalers,
    pub entity_index: EntityIndex,
}

/// Paths written by [`DatasetExporter::export`].
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub sequences: usize,
}

/// NumPy exporter for a [`PreparedDataset`].
pub struct DatasetExporter {
    output_dir: PathBuf,
}

impl DatasetExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export every split, the metadata and the fitted scalers.
    pub fn export(&self, dataset: &PreparedDataset, config: &PipelineConfig) -> Result<ExportSummary> {
        fs::create_dir_all(&self.output_dir)?;
        let window_size = config.sequence.window_size;
        let mut summary = ExportSummary::default();

        let splits: [(&str, &[Sequence]); 4] = [
            (SPLITS[0], dataset.train.as_slice()),
            (SPLITS[1], dataset.validation.as_slice()),
            (SPLITS[2], dataset.test.as_slice()),
            (SPLITS[3], dataset.latest.as_slice()),
        ];

        let mut split_meta = BTreeMap::new();
        for (name, sequences) in splits {
            let files = self.export_split(name, sequences, window_size)?;
            summary.files.extend(files);
            summary.sequences += sequences.len();
            split_meta.insert(name.to_string(), SplitSummary::from_sequences(sequences));
        }

        let metadata = DatasetMetadata {
            schema_version: SCHEMA_VERSION.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            n_features: FEATURE_COUNT,
            window_size,
            horizon: config.horizon(),
            n_entities: dataset.entity_index.len(),
            splits: split_meta,
            stats: dataset.stats.clone(),
            config: config.clone(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        summary.files.push(self.write_json("metadata.json", &metadata)?);

        let scalers = ScalerExport {
            scalers: dataset.scalers.clone(),
            entity_index: dataset.entity_index.clone(),
        };
        summary.files.push(self.write_json("scalers.json", &scalers)?);

        log::info!(
            "Exported {} sequences ({} files) to {}",
            summary.sequences,
            summary.files.len(),
            self.output_dir.display()
        );
        Ok(summary)
    }

    /// Write the arrays and key table of one split.
    pub fn export_split(&self, name: &str, sequences: &[Sequence], window_size: usize) -> Result<Vec<PathBuf>> {
        let n = sequences.len();
        let mut files = Vec::with_capacity(6);

        let mut flat = Vec::with_capacity(n * window_size * FEATURE_COUNT);
        for seq in sequences {
            for step in &seq.features {
                flat.extend(step.iter().copied());
            }
        }
        let tensor = Array3::from_shape_vec((n, window_size, FEATURE_COUNT), flat)?;
        files.push(self.write_npy(&format!("{name}_sequences.npy"), &tensor)?);

        let targets: Array1<f64> = sequences.iter().map(|s| s.target).collect();
        files.push(self.write_npy(&format!("{name}_targets.npy"), &targets)?);

        let labels: Array1<u8> = sequences
            .iter()
            .map(|s| s.cls_label.map(|l| l.as_int()).unwrap_or(0))
            .collect();
        files.push(self.write_npy(&format!("{name}_cls_labels.npy"), &labels)?);

        let weights: Array1<f64> = sequences.iter().map(|s| s.cls_weight).collect();
        files.push(self.write_npy(&format!("{name}_cls_weights.npy"), &weights)?);

        let index: Array1<i64> = sequences.iter().map(|s| s.entity_index as i64).collect();
        files.push(self.write_npy(&format!("{name}_entity_index.npy"), &index)?);

        let keys_path = self.output_dir.join(format!("{name}_keys.csv"));
        let mut wtr = csv::Writer::from_path(&keys_path)?;
        wtr.write_record(["entity_id", "base_date"])?;
        for seq in sequences {
            wtr.write_record([seq.entity_id.clone(), seq.base_date.to_string()])?;
        }
        wtr.flush()?;
        files.push(keys_path);

        log::debug!("{name}: [{n} x {window_size} x {FEATURE_COUNT}]");
        Ok(files)
    }

    fn write_npy<A, D>(&self, file_name: &str, array: &ndarray::ArrayBase<A, D>) -> Result<PathBuf>
    where
        A: ndarray::Data,
        A::Elem: ndarray_npy::WritableElement,
        D: ndarray::Dimension,
    {
        let path = self.output_dir.join(file_name);
        let mut file = File::create(&path)?;
        array.write_npy(&mut file)?;
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::ClassLabel;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn seq(entity: &str, index: usize, day: u32, label: Option<ClassLabel>) -> Sequence {
        Sequence {
            entity_id: entity.to_string(),
            entity_index: index,
            base_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            features: vec![Arc::new(vec![0.5; FEATURE_COUNT]); 3],
            target: 0.25,
            target_excess_log: 0.01,
            market_target_log: 0.0,
            last_close: 10.0,
            cls_label: label,
            cls_weight: if label.is_some() { 1.0 } else { 0.0 },
        }
    }

    #[test]
    fn test_export_split_files() {
        let dir = tempdir().unwrap();
        let exporter = DatasetExporter::new(dir.path());
        let seqs = vec![
            seq("A", 0, 5, Some(ClassLabel::Top)),
            seq("B", 1, 5, None),
        ];

        let files = exporter.export_split("test", &seqs, 3).unwrap();
        assert_eq!(files.len(), 6);
        for f in &files {
            assert!(f.exists(), "{} missing", f.display());
        }

        let keys = fs::read_to_string(dir.path().join("test_keys.csv")).unwrap();
        assert_eq!(keys, "entity_id,base_date\nA,2024-01-05\nB,2024-01-05\n");
    }

    #[test]
    fn test_empty_split_writes_empty_arrays() {
        let dir = tempdir().unwrap();
        let exporter = DatasetExporter::new(dir.path());
        let files = exporter.export_split("validation", &[], 15).unwrap();
        assert!(files.iter().all(|f| f.exists()));
    }

    #[test]
    fn test_wrong_window_is_shape_error() {
        let dir = tempdir().unwrap();
        let exporter = DatasetExporter::new(dir.path());
        let seqs = vec![seq("A", 0, 5, None)];
        assert!(exporter.export_split("train", &seqs, 4).is_err());
    }

    #[test]
    fn test_split_summary() {
        let seqs = vec![
            seq("A", 0, 9, Some(ClassLabel::Bottom)),
            seq("B", 1, 3, None),
        ];
        let s = SplitSummary::from_sequences(&seqs);
        assert_eq!(s.n_sequences, 2);
        assert_eq!(s.n_labeled, 1);
        assert_eq!(s.first_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(s.last_date, NaiveDate::from_ymd_opt(2024, 1, 9));
    }
}

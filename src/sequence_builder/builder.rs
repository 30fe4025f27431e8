//! Sliding-window sequence generation per entity.
//!
//! # Architecture
//!
//! - **SequenceConfig**: window length T and stride
//! - **SequenceBuilder**: groups a partition by entity and slices windows
//! - **Sequence**: one window plus its target, labels and metadata
//!
//! For an entity with `len` rows (sorted by date), windows start at
//! `i = 0, stride, 2·stride, … < len - T`; the window is rows `[i, i+T)` and
//! every target/label is taken from row `i+T-1`:
//!
//! ```text
//! rows:     r0  r1  r2  r3  r4  r5      (len = 6, T = 3)
//! i = 0:   [r0  r1  r2]                  target of r2
//! i = 1:       [r1  r2  r3]              target of r3
//! i = 2:           [r2  r3  r4]          target of r4
//! ```
//!
//! # Memory Management
//!
//! Each row is scaled once into a [`FeatureVec`]; overlapping windows share
//! those vectors by reference count instead of copying them.
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::sequence_builder::{SequenceBuilder, SequenceConfig};
//!
//! let builder = SequenceBuilder::new(SequenceConfig::default());
//! let (train_seqs, stats) = builder.build(&partitions.train, &scalers, &entity_index)?;
//! ```

use crate::error::{PipelineError, Result};
use crate::labeling::ClassLabel;
use crate::preprocessing::FittedScalers;
use crate::schema::{EntityIndex, LabeledRow};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Type Aliases for Zero-Copy Sequence Building
// ============================================================================

/// Shared scaled feature vector.
///
/// Cloning is a reference-count increment, so T overlapping windows over the
/// same row hold one copy of its features.
pub type FeatureVec = Arc<Vec<f64>>;

/// Configuration for sequence building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Rows per window (T)
    pub window_size: usize,

    /// Offset between consecutive window starts
    pub stride: usize,
}

impl SequenceConfig {
    pub fn new(window_size: usize, stride: usize) -> Self {
        Self {
            window_size,
            stride,
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be > 0".to_string());
        }
        if self.stride == 0 {
            return Err("stride must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self::new(15, 1)
    }
}

/// One model sample: T consecutive scaled rows of one entity.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Entity identifier
    pub entity_id: String,

    /// Dense entity index (embedding key)
    pub entity_index: usize,

    /// Date of the last row in the window
    pub base_date: NaiveDate,

    /// Scaled feature vectors, oldest first: `features[step][feature]`
    pub features: Vec<FeatureVec>,

    /// Scaled `target_excess_log` of the last row
    pub target: f64,

    /// Unscaled `target_excess_log` of the last row
    pub target_excess_log: f64,

    /// Same-date market mean of `target_log` for the last row
    pub market_target_log: f64,

    /// Close of the last row
    pub last_close: f64,

    /// Classification label of the last row
    pub cls_label: Option<ClassLabel>,

    /// 1.0 iff `cls_label` is defined
    pub cls_weight: f64,
}

impl Sequence {
    /// Number of rows in the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Classification target as 0.0 / 1.0 (0.0 when unlabeled; see `cls_weight`).
    #[inline]
    pub fn cls_target(&self) -> f64 {
        self.cls_label.map(|l| l.as_f64()).unwrap_or(0.0)
    }

    /// Flattened `[T × F]` copy.
    pub fn as_flat(&self) -> Vec<f64> {
        let width = self.features.first().map(|f| f.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(self.features.len() * width);
        for step in &self.features {
            flat.extend_from_slice(step);
        }
        flat
    }
}

/// Counters from one `build` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStats {
    /// Rows in the partition
    pub rows: usize,

    /// Entities in the partition
    pub entities: usize,

    /// Entities with at most T rows (no sequences)
    pub entities_skipped: usize,

    /// Sequences emitted
    pub sequences: usize,
}

/// Builds [`Sequence`]s from a labeled partition.
#[derive(Debug, Clone, Default)]
pub struct SequenceBuilder {
    config: SequenceConfig,
}

impl SequenceBuilder {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// All sliding windows of a partition.
    ///
    /// Entities are processed independently in parallel; output is ordered by
    /// entity id, then base date.
    pub fn build(
        &self,
        rows: &[LabeledRow],
        scalers: &FittedScalers,
        index: &EntityIndex,
    ) -> Result<(Vec<Sequence>, SequenceStats)> {
        let groups = group_by_entity(rows);
        let t = self.config.window_size;
        let stride = self.config.stride;

        let per_entity: Vec<Vec<Sequence>> = groups
            .par_iter()
            .map(|(entity_id, group)| -> Result<Vec<Sequence>> {
                if group.len() <= t {
                    return Ok(Vec::new());
                }
                let entity_index = lookup(index, entity_id)?;
                let scaled = scale_all(group, scalers)?;

                let n = group.len() - t;
                Ok((0..n)
                    .step_by(stride)
                    .map(|i| make_sequence(entity_id, entity_index, group, &scaled, i, t, scalers))
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = SequenceStats {
            rows: rows.len(),
            entities: groups.len(),
            entities_skipped: groups.iter().filter(|(_, g)| g.len() <= t).count(),
            sequences: per_entity.iter().map(Vec::len).sum(),
        };
        log::debug!(
            "Built {} sequences from {} rows ({} of {} entities not longer than window {})",
            stats.sequences,
            stats.rows,
            stats.entities_skipped,
            stats.entities,
            t
        );

        Ok((per_entity.into_iter().flatten().collect(), stats))
    }

    /// The most recent window of every entity with at least T rows.
    ///
    /// Used for out-of-sample forecasts; the window ends at the entity's last
    /// row, whatever partition it falls in.
    pub fn build_latest<'a, I>(
        &self,
        rows: I,
        scalers: &FittedScalers,
        index: &EntityIndex,
    ) -> Result<Vec<Sequence>>
    where
        I: IntoIterator<Item = &'a LabeledRow>,
    {
        let t = self.config.window_size;
        group_by_entity(rows)
            .par_iter()
            .filter(|(_, group)| group.len() >= t)
            .map(|(entity_id, group)| -> Result<Sequence> {
                let entity_index = lookup(index, entity_id)?;
                let tail = &group[group.len() - t..];
                let scaled = scale_all(tail, scalers)?;
                Ok(make_sequence(entity_id, entity_index, tail, &scaled, 0, t, scalers))
            })
            .collect()
    }
}

/// Entity → rows sorted by date.
fn group_by_entity<'a, I>(rows: I) -> Vec<(String, Vec<&'a LabeledRow>)>
where
    I: IntoIterator<Item = &'a LabeledRow>,
{
    let mut groups: BTreeMap<&str, Vec<&LabeledRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.entity_id()).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(id, mut g)| {
            g.sort_by_key(|r| r.date());
            (id.to_string(), g)
        })
        .collect()
}

fn lookup(index: &EntityIndex, entity_id: &str) -> Result<usize> {
    index
        .get(entity_id)
        .ok_or_else(|| PipelineError::config(format!("entity {} missing from entity index", entity_id)))
}

fn scale_all(group: &[&LabeledRow], scalers: &FittedScalers) -> Result<Vec<FeatureVec>> {
    group
        .iter()
        .map(|r| scalers.scale_row(r).map(Arc::new))
        .collect()
}

fn make_sequence(
    entity_id: &str,
    entity_index: usize,
    group: &[&LabeledRow],
    scaled: &[FeatureVec],
    start: usize,
    t: usize,
    scalers: &FittedScalers,
) -> Sequence {
    let last = group[start + t - 1];
    Sequence {
        entity_id: entity_id.to_string(),
        entity_index,
        base_date: last.date(),
        features: scaled[start..start + t].to_vec(),
        target: scalers.target.transform(last.target_excess_log),
        target_excess_log: last.target_excess_log,
        market_target_log: last.market_target_log,
        last_close: last.close(),
        cls_label: last.cls_label,
        cls_weight: last.cls_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::cross_section::tests::labeled;

    fn partition(entities: &[(&str, u32)]) -> Vec<LabeledRow> {
        let mut rows = Vec::new();
        for (e, days) in entities {
            for d in 1..=*days {
                let mut r = labeled(e, d, 0.0, 0.0);
                r.features.observation.close = 100.0 + d as f64;
                r.target_excess_log = d as f64 / 100.0;
                if d % 2 == 0 {
                    r.cls_label = Some(ClassLabel::Top);
                    r.cls_weight = 1.0;
                }
                rows.push(r);
            }
        }
        rows
    }

    fn fixtures(rows: &[LabeledRow]) -> (FittedScalers, EntityIndex) {
        let scalers = FittedScalers::fit(rows).unwrap();
        let index = EntityIndex::from_ids(rows.iter().map(|r| r.entity_id()));
        (scalers, index)
    }

    #[test]
    fn test_sequence_count_is_len_minus_t() {
        let rows = partition(&[("A", 20), ("B", 15), ("C", 10)]);
        let (scalers, index) = fixtures(&rows);
        let builder = SequenceBuilder::new(SequenceConfig::new(15, 1));
        let (seqs, stats) = builder.build(&rows, &scalers, &index).unwrap();

        // A: 20 - 15 = 5, B: exactly T rows and C: below T are both skipped
        assert_eq!(seqs.len(), 5);
        assert_eq!(stats.entities_skipped, 2);
        assert_eq!(stats.entities, 3);
        assert!(seqs.iter().all(|s| s.entity_id == "A" && s.len() == 15));
    }

    #[test]
    fn test_target_taken_from_last_row_of_window() {
        let rows = partition(&[("A", 8)]);
        let (scalers, index) = fixtures(&rows);
        let builder = SequenceBuilder::new(SequenceConfig::new(3, 1));
        let (seqs, _) = builder.build(&rows, &scalers, &index).unwrap();

        assert_eq!(seqs.len(), 5);
        for (i, s) in seqs.iter().enumerate() {
            let last_day = (i + 3) as u32;
            assert_eq!(s.base_date, rows[last_day as usize - 1].date());
            assert!((s.target_excess_log - last_day as f64 / 100.0).abs() < 1e-12);
            assert_eq!(s.cls_weight, if last_day % 2 == 0 { 1.0 } else { 0.0 });
            assert_eq!(s.last_close, 100.0 + last_day as f64);
            let back = scalers.target.inverse_transform(s.target);
            assert!((back - s.target_excess_log).abs() < 1e-12);
        }
    }

    #[test]
    fn test_windows_share_rows() {
        let rows = partition(&[("A", 6)]);
        let (scalers, index) = fixtures(&rows);
        let (seqs, _) = SequenceBuilder::new(SequenceConfig::new(3, 1))
            .build(&rows, &scalers, &index)
            .unwrap();
        assert!(Arc::ptr_eq(&seqs[0].features[1], &seqs[1].features[0]));
        assert_eq!(seqs[0].as_flat().len(), 3 * crate::schema::FEATURE_COUNT);
    }

    #[test]
    fn test_stride() {
        let rows = partition(&[("A", 10)]);
        let (scalers, index) = fixtures(&rows);
        let (seqs, _) = SequenceBuilder::new(SequenceConfig::new(3, 3))
            .build(&rows, &scalers, &index)
            .unwrap();
        // starts 0, 3, 6 (< 7)
        assert_eq!(seqs.len(), 3);
    }

    #[test]
    fn test_latest_window_ends_at_last_row() {
        let rows = partition(&[("A", 10), ("B", 2)]);
        let (scalers, index) = fixtures(&rows);
        let latest = SequenceBuilder::new(SequenceConfig::new(4, 1))
            .build_latest(&rows, &scalers, &index)
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].base_date, rows[9].date());
        assert_eq!(latest[0].len(), 4);
    }

    #[test]
    fn test_unknown_entity_is_error() {
        let rows = partition(&[("A", 5)]);
        let (scalers, _) = fixtures(&rows);
        let empty = EntityIndex::default();
        let result = SequenceBuilder::new(SequenceConfig::new(2, 1)).build(&rows, &scalers, &empty);
        assert!(result.is_err());
    }
}

//! Chronological train / validation / test partitioning.
//!
//! ```text
//! sorted by (date, entity_id)
//! ├──────────────── train+val (first 80%) ───────────────┤── test (20%) ──┤
//! ├────────── train (90%) ──────────┤── validation (10%) ─┤
//! ```
//!
//! Cuts are by row position. [`BoundaryMode::DateAligned`] moves each cut
//! forward to the next date change so that no date straddles two partitions.

use crate::schema::LabeledRow;
use serde::{Deserialize, Serialize};

/// How partition cuts treat a date shared by rows on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Cut at the exact row position
    #[default]
    Position,

    /// Push the cut forward to the first row of the next date
    DateAligned,
}

/// Partition fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows (latest) held out for test
    pub test_fraction: f64,

    /// Fraction of the train+validation block (latest) used for validation
    pub validation_fraction: f64,

    /// Cut alignment
    pub boundary: BoundaryMode,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            validation_fraction: 0.1,
            boundary: BoundaryMode::Position,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(format!("test_fraction must be in (0, 1), got {}", self.test_fraction));
        }
        if !(self.validation_fraction >= 0.0 && self.validation_fraction < 1.0) {
            return Err(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            ));
        }
        Ok(())
    }
}

/// The three chronological partitions.
#[derive(Debug, Clone, Default)]
pub struct PartitionedPanel {
    pub train: Vec<LabeledRow>,
    pub validation: Vec<LabeledRow>,
    pub test: Vec<LabeledRow>,
}

impl PartitionedPanel {
    pub fn total_rows(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }
}

/// Splits a labeled panel into [`PartitionedPanel`].
#[derive(Debug, Clone, Default)]
pub struct Partitioner {
    config: SplitConfig,
}

impl Partitioner {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Sort by (date, entity_id) and cut.
    pub fn split(&self, mut rows: Vec<LabeledRow>) -> PartitionedPanel {
        rows.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.entity_id().cmp(b.entity_id()))
        });

        let n = rows.len();
        let mut split = ((n as f64) * (1.0 - self.config.test_fraction)).floor() as usize;
        split = self.align(&rows, split, n);

        let val_size = ((split as f64) * self.config.validation_fraction).floor() as usize;
        let mut train_len = split - val_size;
        if val_size > 0 {
            train_len = self.align(&rows, train_len, split);
        }

        let test = rows.split_off(split);
        let validation = rows.split_off(train_len);
        let train = rows;

        log::info!(
            "Partitioned {} rows: train {}, validation {}, test {}",
            n,
            train.len(),
            validation.len(),
            test.len()
        );

        PartitionedPanel {
            train,
            validation,
            test,
        }
    }

    /// Move `cut` forward past rows sharing the date just before it, up to `limit`.
    fn align(&self, rows: &[LabeledRow], mut cut: usize, limit: usize) -> usize {
        if self.config.boundary == BoundaryMode::Position {
            return cut;
        }
        while cut > 0 && cut < limit && rows[cut].date() == rows[cut - 1].date() {
            cut += 1;
        }
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::cross_section::tests::labeled;

    fn panel(days: u32, entities: &[&str]) -> Vec<LabeledRow> {
        let mut rows = Vec::new();
        // deliberately entity-major to check the re-sort
        for e in entities {
            for d in 1..=days {
                rows.push(labeled(e, d, 0.0, 0.0));
            }
        }
        rows
    }

    #[test]
    fn test_position_split_sizes() {
        let parts = Partitioner::default().split(panel(10, &["A", "B"]));
        // 20 rows -> 16 train+val -> val 1
        assert_eq!(parts.test.len(), 4);
        assert_eq!(parts.validation.len(), 1);
        assert_eq!(parts.train.len(), 15);
        assert_eq!(parts.total_rows(), 20);
    }

    #[test]
    fn test_chronological_order() {
        let parts = Partitioner::default().split(panel(30, &["A", "B", "C"]));
        let max_train = parts.train.iter().map(|r| r.date()).max().unwrap();
        let min_val = parts.validation.iter().map(|r| r.date()).min().unwrap();
        let max_val = parts.validation.iter().map(|r| r.date()).max().unwrap();
        let min_test = parts.test.iter().map(|r| r.date()).min().unwrap();
        assert!(max_train <= min_val);
        assert!(min_val <= max_val);
        assert!(max_val <= min_test);
    }

    #[test]
    fn test_small_panel_has_empty_validation() {
        let parts = Partitioner::default().split(panel(5, &["A"]));
        assert_eq!(parts.test.len(), 1);
        assert!(parts.validation.is_empty());
        assert_eq!(parts.train.len(), 4);
    }

    #[test]
    fn test_date_aligned_never_straddles() {
        let config = SplitConfig {
            boundary: BoundaryMode::DateAligned,
            ..Default::default()
        };
        let parts = Partitioner::new(config).split(panel(37, &["A", "B", "C"]));

        let max_train = parts.train.iter().map(|r| r.date()).max().unwrap();
        let min_val = parts.validation.iter().map(|r| r.date()).min().unwrap();
        let max_val = parts.validation.iter().map(|r| r.date()).max().unwrap();
        let min_test = parts.test.iter().map(|r| r.date()).min().unwrap();
        assert!(max_train < min_val);
        assert!(max_val < min_test);
        assert_eq!(parts.total_rows(), 111);
        // position cut would have been 88, inside day 30
        assert_eq!(parts.test.len(), 21);
    }

    #[test]
    fn test_validate() {
        assert!(SplitConfig::default().validate().is_ok());
        let bad = SplitConfig {
            test_fraction: 1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}

//! Data Validation Module
//!
//! Checks run between pipeline stages so that malformed data is reported
//! where it first appears rather than as a confusing metric later.
//!
//! # Validation Categories
//!
//! 1. **Panel**: per-entity date order, unique `(entity_id, date)`, positive close
//! 2. **Features**: NaN/Inf in the model feature vector
//! 3. **Partitions**: chronological separation of train / validation / test
//!
//! # Usage
//!
//! ```ignore
//! use excess_return_pipeline::validation::validate_partitions;
//!
//! let result = validate_partitions(&partitions);
//! if !result.is_valid() {
//!     for warning in result.warnings() {
//!         log::warn!("{warning}");
//!     }
//! }
//! ```

use crate::schema::{LabeledRow, ObservationRow, FEATURE_NAMES};
use crate::split::PartitionedPanel;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    /// Check if this result indicates valid data.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    /// Check if this result is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// `check: message` for every warning.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// `check: message` for every error.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Emit warnings and errors through `log`.
    pub fn log(&self, stage: &str) {
        for w in self.warnings() {
            log::warn!("[{stage}] {w}");
        }
        for e in self.errors() {
            log::error!("[{stage}] {e}");
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Panel
// ============================================================================

/// Ordering, key uniqueness and price sanity of an observation panel.
pub fn validate_panel(rows: &[ObservationRow]) -> ValidationResult {
    let mut result = ValidationResult::new();

    let mut last_date: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    let mut out_of_order = 0usize;
    let mut duplicates = 0usize;
    for row in rows {
        if let Some(prev) = last_date.get(row.entity_id.as_str()) {
            if row.date == *prev {
                duplicates += 1;
            } else if row.date < *prev {
                out_of_order += 1;
            }
        }
        last_date.insert(&row.entity_id, row.date);
    }

    result.add(
        "entity_date_order",
        if out_of_order == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{out_of_order} rows earlier than their predecessor"))
        },
    );
    result.add(
        "unique_keys",
        if duplicates == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{duplicates} duplicate (entity_id, date) rows"))
        },
    );

    let non_positive = rows.iter().filter(|r| !(r.close > 0.0)).count();
    result.add(
        "positive_close",
        if non_positive == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{non_positive} rows with close <= 0"))
        },
    );

    let non_finite = rows
        .iter()
        .filter(|r| r.raw_fields().iter().any(|v| !v.is_finite()))
        .count();
    result.add(
        "finite_raw_fields",
        if non_finite == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Warning(format!("{non_finite} rows with NaN/Inf raw fields"))
        },
    );

    result
}

// ============================================================================
// Features
// ============================================================================

/// NaN/Inf scan over the model feature vectors.
pub fn validate_features(rows: &[LabeledRow]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut per_feature = [0usize; FEATURE_NAMES.len()];

    for row in rows {
        for (count, v) in per_feature.iter_mut().zip(row.feature_vector()) {
            if !v.is_finite() {
                *count += 1;
            }
        }
    }

    for (name, &count) in FEATURE_NAMES.iter().zip(&per_feature) {
        let level = if count == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{count} non-finite values"))
        };
        result.add(name, level);
    }

    let bad_targets = rows.iter().filter(|r| !r.target_excess_log.is_finite()).count();
    result.add(
        "target_excess_log",
        if bad_targets == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{bad_targets} non-finite targets"))
        },
    );

    result
}

// ============================================================================
// Partitions
// ============================================================================

fn date_range(rows: &[LabeledRow]) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(|r| r.date()).min()?;
    let max = rows.iter().map(|r| r.date()).max()?;
    Some((min, max))
}

fn check_boundary(result: &mut ValidationResult, name: &str, earlier: &[LabeledRow], later: &[LabeledRow]) {
    let level = match (date_range(earlier), date_range(later)) {
        (Some((_, max_earlier)), Some((min_later, _))) => {
            if max_earlier < min_later {
                ValidationLevel::Valid
            } else if max_earlier == min_later {
                ValidationLevel::Warning(format!("date {max_earlier} straddles the boundary"))
            } else {
                ValidationLevel::Error(format!(
                    "earlier partition ends {max_earlier} after later partition starts {min_later}"
                ))
            }
        }
        _ => ValidationLevel::Valid,
    };
    result.add(name, level);
}

/// Chronological separation of the three partitions.
///
/// A date shared across a boundary is a warning (position cuts allow it); any
/// overlap beyond that is an error.
pub fn validate_partitions(partitions: &PartitionedPanel) -> ValidationResult {
    let mut result = ValidationResult::new();

    result.add(
        "train_not_empty",
        if partitions.train.is_empty() {
            ValidationLevel::Error("training partition is empty".to_string())
        } else {
            ValidationLevel::Valid
        },
    );
    if partitions.validation.is_empty() {
        result.add(
            "validation_not_empty",
            ValidationLevel::Warning("validation partition is empty".to_string()),
        );
    }

    check_boundary(&mut result, "train_before_validation", &partitions.train, &partitions.validation);
    check_boundary(&mut result, "validation_before_test", &partitions.validation, &partitions.test);
    check_boundary(&mut result, "train_before_test", &partitions.train, &partitions.test);

    result
}

//! Per-date percentile buckets of the excess target.
//!
//! ```text
//! pct = rank / n                      (rank is 1-based)
//!
//! pct >= 1 - top_frac   → Top
//! pct <= bottom_frac    → Bottom
//! otherwise             → unlabeled (weight 0)
//! ```
//!
//! Boundaries are inclusive with a 1e-12 tolerance.

use super::{ClassLabel, LabelConfig, TieBreak};
use crate::schema::LabeledRow;
use crate::stats::{average_ranks, ordinal_ranks};
use chrono::NaiveDate;
use std::collections::BTreeMap;

const BOUNDARY_TOLERANCE: f64 = 1e-12;

/// Percentile ranks in `(0, 1]` for one cross-section.
///
/// With [`TieBreak::First`], ties are ordered by position in `values`.
pub fn percentile_ranks(values: &[f64], tie_break: TieBreak) -> Vec<f64> {
    let n = values.len() as f64;
    match tie_break {
        TieBreak::Average => average_ranks(values).into_iter().map(|r| r / n).collect(),
        TieBreak::First => ordinal_ranks(values)
            .into_iter()
            .map(|r| r as f64 / n)
            .collect(),
    }
}

/// Classify one percentile.
#[inline]
pub fn classify(pct: f64, top_frac: f64, bottom_frac: f64) -> Option<ClassLabel> {
    if pct >= 1.0 - top_frac - BOUNDARY_TOLERANCE {
        Some(ClassLabel::Top)
    } else if pct <= bottom_frac + BOUNDARY_TOLERANCE {
        Some(ClassLabel::Bottom)
    } else {
        None
    }
}

/// Set `cls_label` / `cls_weight` on every row from its same-date rank.
///
/// Returns the number of distinct dates ranked.
pub fn assign_classes(rows: &mut [LabeledRow], config: &LabelConfig) -> usize {
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        by_date.entry(row.date()).or_default().push(i);
    }

    for indices in by_date.values_mut() {
        // entity order fixes First tie-breaking regardless of input order
        indices.sort_by(|&a, &b| rows[a].entity_id().cmp(rows[b].entity_id()));

        let values: Vec<f64> = indices.iter().map(|&i| rows[i].target_excess_log).collect();
        let pct = percentile_ranks(&values, config.tie_break);

        for (&i, p) in indices.iter().zip(pct) {
            let label = classify(p, config.top_frac, config.bottom_frac);
            rows[i].cls_label = label;
            rows[i].cls_weight = if label.is_some() { 1.0 } else { 0.0 };
        }
    }
    by_date.len()
}

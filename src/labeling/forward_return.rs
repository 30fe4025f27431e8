//! Horizon-H forward log returns.
//!
//! ```text
//! target_log(t) = ln(close[t+H] / close[t])
//! ```
//!
//! `t+H` is a row offset within the entity's own history, not a calendar
//! offset. The last `H` rows of every entity have no forward close and are
//! dropped.

use crate::schema::{FeatureRow, LabeledRow};
use std::collections::BTreeMap;

/// Attach forward log returns, dropping rows without one.
///
/// Returns the labeled rows (ordered by entity, then date) and the number of
/// rows dropped.
pub fn horizon_targets(rows: Vec<FeatureRow>, horizon: usize) -> (Vec<LabeledRow>, usize) {
    let total = rows.len();

    let mut groups: BTreeMap<String, Vec<FeatureRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.observation.entity_id.clone())
            .or_default()
            .push(row);
    }

    let mut out = Vec::with_capacity(total);
    for (_, mut group) in groups {
        group.sort_by_key(|r| r.date());
        let closes: Vec<f64> = group.iter().map(|r| r.close()).collect();

        for (i, row) in group.into_iter().enumerate() {
            let Some(&future) = closes.get(i + horizon) else {
                break;
            };
            let target = (future / closes[i]).ln();
            if target.is_finite() {
                out.push(LabeledRow::with_target(row, target));
            }
        }
    }

    let dropped = total - out.len();
    log::debug!(
        "Horizon {} targets: {} rows labeled, {} dropped at history end",
        horizon,
        out.len(),
        dropped
    );
    (out, dropped)
}

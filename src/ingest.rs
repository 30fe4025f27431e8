//! Panel ingestion: date normalisation, per-entity ordering, gap filling.
//!
//! # Overview
//!
//! ```text
//! CSV / RawObservation ──▶ normalize_date ──▶ group by entity ──▶ sort by date
//!                                                   │
//!                          drop close <= 0 ◀── ffill → bfill → 0 ◀── dedupe (last wins)
//! ```
//!
//! Output rows are grouped by entity (ascending id) and ascending by date within
//! an entity, with every numeric field populated.
//!
//! # Example
//!
//! ```ignore
//! use excess_return_pipeline::ingest::PanelLoader;
//!
//! let panel = PanelLoader::from_csv_path("prices.csv")?;
//! println!("{} rows, {} duplicates", panel.rows.len(), panel.stats.duplicates);
//! ```

use crate::error::{PipelineError, Result};
use crate::schema::ObservationRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Number of raw numeric fields per observation.
pub const RAW_FIELD_COUNT: usize = 12;

// ============================================================================
// Dates
// ============================================================================

/// A date as it arrives from upstream: `YYYYMMDD` integer or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Int(i64),
    Text(String),
}

impl From<i64> for DateValue {
    fn from(v: i64) -> Self {
        DateValue::Int(v)
    }
}

impl From<&str> for DateValue {
    fn from(v: &str) -> Self {
        DateValue::Text(v.to_string())
    }
}

/// Normalise an integer or string date to a calendar date.
///
/// Accepted: `20240102`, `"20240102"`, `"2024-01-02"`, `"2024/01/02"`.
/// Integers read through a float column (`"20240102.0"`) are accepted too.
///
/// ```
/// use chrono::NaiveDate;
/// use excess_return_pipeline::ingest::{normalize_date, DateValue};
///
/// let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// assert_eq!(normalize_date(&DateValue::Int(20240102)).unwrap(), d);
/// assert_eq!(normalize_date(&"2024/01/02".into()).unwrap(), d);
/// assert!(normalize_date(&"yesterday".into()).is_err());
/// ```
pub fn normalize_date(value: &DateValue) -> Result<NaiveDate> {
    match value {
        DateValue::Int(v) => parse_compact(&v.to_string()),
        DateValue::Text(s) => {
            let s = s.trim();
            let s = s.strip_suffix(".0").unwrap_or(s);
            if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
                return parse_compact(s);
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
                .map_err(|_| PipelineError::InvalidDate(s.to_string()))
        }
    }
}

fn parse_compact(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| PipelineError::InvalidDate(s.to_string()))
}

// ============================================================================
// Raw input
// ============================================================================

/// One input row before normalisation. Every numeric field may be missing.
///
/// CSV headers use the names below; the upstream database column names are
/// accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(alias = "stk_cd")]
    pub entity_id: String,
    pub date: String,
    #[serde(default, alias = "open_pric")]
    pub open: Option<f64>,
    #[serde(default, alias = "high_pric")]
    pub high: Option<f64>,
    #[serde(default, alias = "low_pric")]
    pub low: Option<f64>,
    #[serde(default, alias = "close_pric")]
    pub close: Option<f64>,
    #[serde(default, alias = "oyr_hgst")]
    pub high_52w: Option<f64>,
    #[serde(default, alias = "oyr_lwst")]
    pub low_52w: Option<f64>,
    #[serde(default, alias = "base_pric")]
    pub base_price: Option<f64>,
    #[serde(default, alias = "access_cur_prc")]
    pub current_price: Option<f64>,
    #[serde(default, alias = "trde_qty")]
    pub volume: Option<f64>,
    #[serde(default)]
    pub rank: Option<f64>,
    #[serde(default, alias = "acc_trde_qty")]
    pub acc_volume: Option<f64>,
    #[serde(default, alias = "listcount")]
    pub listed_shares: Option<f64>,
}

impl RawObservation {
    /// Convenience constructor with every numeric field set (tests, synthetic panels).
    pub fn complete(entity_id: &str, date: impl Into<String>, close: f64, volume: f64) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            date: date.into(),
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            high_52w: Some(close),
            low_52w: Some(close),
            base_price: Some(close),
            current_price: Some(close),
            volume: Some(volume),
            rank: Some(0.0),
            acc_volume: Some(volume),
            listed_shares: Some(0.0),
        }
    }

    fn numeric_fields(&self) -> [Option<f64>; RAW_FIELD_COUNT] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.high_52w,
            self.low_52w,
            self.base_price,
            self.current_price,
            self.volume,
            self.rank,
            self.acc_volume,
            self.listed_shares,
        ]
    }
}

fn observation_from_fields(
    entity_id: &str,
    date: NaiveDate,
    f: [f64; RAW_FIELD_COUNT],
) -> ObservationRow {
    ObservationRow {
        entity_id: entity_id.to_string(),
        date,
        open: f[0],
        high: f[1],
        low: f[2],
        close: f[3],
        high_52w: f[4],
        low_52w: f[5],
        base_price: f[6],
        current_price: f[7],
        volume: f[8],
        rank: f[9],
        acc_volume: f[10],
        listed_shares: f[11],
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Counters reported by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Input rows read
    pub rows_read: usize,
    /// Rows dropped because the date could not be parsed
    pub invalid_dates: usize,
    /// Rows replaced by a later row with the same (entity, date)
    pub duplicates: usize,
    /// Numeric cells filled (forward, backward or zero)
    pub filled_cells: usize,
    /// Rows dropped because close <= 0 after filling
    pub non_positive_close: usize,
    /// Rows emitted
    pub rows_out: usize,
    /// Distinct entities emitted
    pub entities: usize,
}

/// Normalised panel plus ingestion counters.
#[derive(Debug, Clone, Default)]
pub struct IngestedPanel {
    pub rows: Vec<ObservationRow>,
    pub stats: IngestStats,
}

/// Loads and normalises the raw observation panel.
pub struct PanelLoader;

impl PanelLoader {
    /// Read a CSV file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<IngestedPanel> {
        let file = std::fs::File::open(path.as_ref())?;
        log::info!("Loading panel from {}", path.as_ref().display());
        Self::from_reader(file)
    }

    /// Read CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<IngestedPanel> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut raw = Vec::new();
        for record in rdr.deserialize::<RawObservation>() {
            raw.push(record?);
        }
        Ok(Self::normalize(raw))
    }

    /// Normalise in-memory raw rows.
    pub fn normalize(raw: Vec<RawObservation>) -> IngestedPanel {
        let mut stats = IngestStats {
            rows_read: raw.len(),
            ..Default::default()
        };

        // entity -> [(date, row)] in input order
        let mut by_entity: BTreeMap<String, Vec<(NaiveDate, RawObservation)>> = BTreeMap::new();
        for obs in raw {
            match normalize_date(&DateValue::Text(obs.date.clone())) {
                Ok(date) => by_entity
                    .entry(obs.entity_id.clone())
                    .or_default()
                    .push((date, obs)),
                Err(e) => {
                    log::debug!("Dropping row for {}: {}", obs.entity_id, e);
                    stats.invalid_dates += 1;
                }
            }
        }

        let mut rows = Vec::with_capacity(stats.rows_read);
        for (entity_id, mut group) in by_entity {
            // Stable sort keeps input order among equal dates, so the last one wins below.
            group.sort_by_key(|(date, _)| *date);

            let mut deduped: Vec<(NaiveDate, [Option<f64>; RAW_FIELD_COUNT])> =
                Vec::with_capacity(group.len());
            for (date, obs) in group {
                let fields = obs.numeric_fields();
                match deduped.last_mut() {
                    Some(last) if last.0 == date => {
                        *last = (date, fields);
                        stats.duplicates += 1;
                    }
                    _ => deduped.push((date, fields)),
                }
            }

            let filled = fill_gaps(&deduped, &mut stats.filled_cells);

            let mut kept = 0;
            for ((date, _), values) in deduped.iter().zip(filled) {
                if values[3] > 0.0 {
                    rows.push(observation_from_fields(&entity_id, *date, values));
                    kept += 1;
                } else {
                    stats.non_positive_close += 1;
                }
            }
            if kept > 0 {
                stats.entities += 1;
            }
        }

        stats.rows_out = rows.len();
        log::info!(
            "Ingested {} rows ({} entities); dropped {} invalid dates, {} duplicates, {} non-positive closes",
            stats.rows_out,
            stats.entities,
            stats.invalid_dates,
            stats.duplicates,
            stats.non_positive_close
        );

        IngestedPanel { rows, stats }
    }
}

/// Forward-fill, then back-fill, then zero-fill each column of one entity.
fn fill_gaps(
    rows: &[(NaiveDate, [Option<f64>; RAW_FIELD_COUNT])],
    filled_cells: &mut usize,
) -> Vec<[f64; RAW_FIELD_COUNT]> {
    let mut out = vec![[0.0; RAW_FIELD_COUNT]; rows.len()];

    for col in 0..RAW_FIELD_COUNT {
        let present = |v: Option<f64>| v.filter(|x| x.is_finite());

        let mut column: Vec<Option<f64>> = rows.iter().map(|(_, f)| present(f[col])).collect();
        *filled_cells += column.iter().filter(|v| v.is_none()).count();

        let mut last = None;
        for v in column.iter_mut() {
            match v {
                Some(x) => last = Some(*x),
                None => *v = last,
            }
        }
        let mut next = None;
        for v in column.iter_mut().rev() {
            match v {
                Some(x) => next = Some(*x),
                None => *v = next,
            }
        }

        for (row, v) in out.iter_mut().zip(column) {
            row[col] = v.unwrap_or(0.0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_date_formats() {
        let want = d(2024, 3, 15);
        for v in [
            DateValue::Int(20240315),
            "20240315".into(),
            "2024-03-15".into(),
            "2024/03/15".into(),
            "20240315.0".into(),
            " 2024-03-15 ".into(),
        ] {
            assert_eq!(normalize_date(&v).unwrap(), want, "{:?}", v);
        }
        assert!(normalize_date(&DateValue::Int(20241345)).is_err());
        assert!(normalize_date(&"".into()).is_err());
    }

    #[test]
    fn test_sorted_and_deduplicated_last_wins() {
        let raw = vec![
            RawObservation::complete("B", "20240103", 10.0, 1.0),
            RawObservation::complete("A", "20240102", 5.0, 1.0),
            RawObservation::complete("B", "20240102", 9.0, 1.0),
            RawObservation::complete("B", "20240103", 11.0, 1.0),
        ];
        let panel = PanelLoader::normalize(raw);

        assert_eq!(panel.stats.duplicates, 1);
        assert_eq!(panel.rows.len(), 3);
        assert_eq!(panel.rows[0].entity_id, "A");
        assert_eq!(panel.rows[1].date, d(2024, 1, 2));
        assert_eq!(panel.rows[2].date, d(2024, 1, 3));
        assert_eq!(panel.rows[2].close, 11.0);
    }

    #[test]
    fn test_forward_then_backward_then_zero_fill() {
        let mut r1 = RawObservation::complete("A", "20240102", 10.0, 100.0);
        let mut r2 = RawObservation::complete("A", "20240103", 11.0, 100.0);
        let r3 = RawObservation::complete("A", "20240104", 12.0, 300.0);
        r1.volume = None; // back-filled from r2
        r2.volume = None; // forward-fill has nothing, back-filled from r3
        r1.rank = None;
        r2.rank = None;
        let mut r3 = r3;
        r3.rank = None; // all missing -> zero
        r1.high = Some(20.0);
        r2.high = None; // forward-filled from r1

        let panel = PanelLoader::normalize(vec![r1, r2, r3]);
        let rows = &panel.rows;
        assert_eq!(rows[0].volume, 300.0);
        assert_eq!(rows[1].volume, 300.0);
        assert_eq!(rows[1].high, 20.0);
        assert!(rows.iter().all(|r| r.rank == 0.0));
        assert_eq!(panel.stats.filled_cells, 6);
    }

    #[test]
    fn test_invalid_date_and_non_positive_close_dropped() {
        let raw = vec![
            RawObservation::complete("A", "not-a-date", 10.0, 1.0),
            RawObservation::complete("A", "20240102", 0.0, 1.0),
            RawObservation::complete("A", "20240103", 10.0, 1.0),
        ];
        let panel = PanelLoader::normalize(raw);
        assert_eq!(panel.stats.invalid_dates, 1);
        assert_eq!(panel.stats.non_positive_close, 1);
        assert_eq!(panel.rows.len(), 1);
        assert_eq!(panel.stats.entities, 1);
    }

    #[test]
    fn test_csv_with_aliases_and_blanks() {
        let csv = "stk_cd,date,open_pric,high_pric,low_pric,close_pric,trde_qty\n\
                   005930,20240102,1,2,0.5,1.5,\n\
                   005930,20240103,1,2,0.5,1.6,1000\n";
        let panel = PanelLoader::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(panel.rows.len(), 2);
        assert_eq!(panel.rows[0].entity_id, "005930");
        assert_eq!(panel.rows[0].volume, 1000.0);
        assert_eq!(panel.rows[1].listed_shares, 0.0);
    }
}

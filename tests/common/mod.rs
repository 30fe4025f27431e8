//! Shared synthetic panels for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use excess_return_pipeline::model::{FilePredictor, PredictionRecord};
use excess_return_pipeline::prelude::*;

pub fn date(day: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day as i64)
}

pub fn entity(e: usize) -> String {
    format!("E{e:02}")
}

pub fn observation(entity_id: &str, day: usize, close: f64, volume: f64) -> ObservationRow {
    ObservationRow {
        entity_id: entity_id.to_string(),
        date: date(day),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        high_52w: close * 1.2,
        low_52w: close * 0.8,
        base_price: close,
        current_price: close,
        volume,
        rank: 1.0,
        acc_volume: volume,
        listed_shares: 1e7,
    }
}

/// Close of entity `e` on `day`: entity-specific drift plus a bounded wiggle.
pub fn trending_close(e: usize, entities: usize, day: usize) -> f64 {
    let drift = 0.002 * (e as f64 - (entities as f64 - 1.0) / 2.0);
    let wiggle = 0.01 * ((day * (e + 3)) as f64 * 0.37).sin();
    10_000.0 * (drift * day as f64 + wiggle).exp()
}

/// `entities × days` panel that passes the default liquidity filter.
pub fn trending_panel(entities: usize, days: usize) -> Vec<ObservationRow> {
    let mut rows = Vec::with_capacity(entities * days);
    for e in 0..entities {
        for d in 0..days {
            rows.push(observation(&entity(e), d, trending_close(e, entities, d), 100_000.0));
        }
    }
    rows
}

/// Small windows so that short panels produce sequences.
pub fn small_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_labels(LabelConfig::default().with_horizon(2))
        .with_sequence(SequenceConfig::new(5, 1))
        .with_filter(FilterConfig::permissive())
}

pub fn prepare(config: PipelineConfig, panel: Vec<ObservationRow>) -> PreparedDataset {
    Pipeline::from_config(config)
        .unwrap()
        .prepare_rows(panel)
        .unwrap()
}

/// Predicts each sequence's realized scaled target.
pub fn oracle_predictor(dataset: &PreparedDataset) -> FilePredictor {
    let records = dataset
        .validation
        .iter()
        .chain(&dataset.test)
        .chain(&dataset.latest)
        .map(|s| PredictionRecord {
            entity_id: s.entity_id.clone(),
            date: s.base_date.to_string(),
            score: s.target,
            probability: 1.0 / (1.0 + (-s.target).exp()),
        })
        .collect();
    FilePredictor::from_records(records).unwrap()
}

/// Panel as CSV text with the documented column names.
pub fn to_csv(rows: &[ObservationRow]) -> String {
    let mut out = String::from(
        "entity_id,date,open,high,low,close,high_52w,low_52w,base_price,current_price,volume,rank,acc_volume,listed_shares\n",
    );
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            r.entity_id,
            r.date.format("%Y%m%d"),
            r.open,
            r.high,
            r.low,
            r.close,
            r.high_52w,
            r.low_52w,
            r.base_price,
            r.current_price,
            r.volume,
            r.rank,
            r.acc_volume,
            r.listed_shares
        ));
    }
    out
}

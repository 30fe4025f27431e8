//! Benchmark suite for pipeline stage throughput.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Per-entity indicator computation over panels of increasing size
//! - Daily IC with monthly / quarterly aggregation
//! - Long-short and bucket evaluation

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use excess_return_pipeline::evaluation::{CrossSectionalEvaluator, EvaluationRecord, PortfolioEvaluator};
use excess_return_pipeline::features::{IndicatorConfig, IndicatorEngine};
use excess_return_pipeline::schema::ObservationRow;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

/// Deterministic pseudo-random walk panel.
fn create_panel(entities: usize, days: usize) -> Vec<ObservationRow> {
    let mut rows = Vec::with_capacity(entities * days);
    for e in 0..entities {
        let mut close = 10_000.0 + 100.0 * e as f64;
        for d in 0..days {
            let shock = (((e * 31 + d * 17) % 97) as f64 - 48.0) / 2_000.0;
            close *= 1.0 + shock;
            let volume = 50_000.0 + ((e * 7 + d * 13) % 1_000) as f64 * 100.0;
            rows.push(ObservationRow {
                entity_id: format!("E{e:04}"),
                date: start_date() + Duration::days(d as i64),
                open: close * 0.99,
                high: close * 1.01,
                low: close * 0.98,
                close,
                high_52w: close * 1.2,
                low_52w: close * 0.8,
                base_price: close,
                current_price: close,
                volume,
                rank: (e + 1) as f64,
                acc_volume: volume,
                listed_shares: 1e7,
            });
        }
    }
    rows
}

fn create_records(entities: usize, days: usize) -> Vec<EvaluationRecord> {
    let mut records = Vec::with_capacity(entities * days);
    for d in 0..days {
        for e in 0..entities {
            let realized = (((e * 13 + d * 7) % 41) as f64 - 20.0) / 1_000.0;
            let predicted = realized * 0.3 + (((e * 5 + d) % 11) as f64 - 5.0) / 2_000.0;
            records.push(EvaluationRecord {
                entity_id: format!("E{e:04}"),
                date: start_date() + Duration::days(d as i64),
                predicted_excess: predicted,
                realized_excess: realized,
                predicted_probability: 0.5,
                predicted_excess_log: predicted,
                realized_excess_log: realized,
                predicted_scaled: predicted,
                realized_scaled: realized,
                market_log: 0.0,
                predicted_raw: predicted,
                realized_raw: realized,
                cls_label: None,
                cls_weight: 0.0,
            });
        }
    }
    records
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let engine = IndicatorEngine::new(IndicatorConfig::default());

    for entities in [10, 100, 500] {
        let panel = create_panel(entities, 250);
        group.throughput(Throughput::Elements(panel.len() as u64));
        group.bench_with_input(BenchmarkId::new("compute_panel", entities), &panel, |b, panel| {
            b.iter(|| engine.compute_panel(black_box(panel)))
        });
    }

    group.finish();
}

fn bench_cross_sectional(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_sectional");
    let records = create_records(200, 250);
    group.throughput(Throughput::Elements(records.len() as u64));

    let ic = CrossSectionalEvaluator::new(3);
    group.bench_function("daily_ic", |b| b.iter(|| ic.evaluate(black_box(&records))));

    let portfolio = PortfolioEvaluator::new(0.2, 10, 5);
    group.bench_function("long_short", |b| {
        b.iter(|| portfolio.long_short(black_box(&records)))
    });
    group.bench_function("long_short_purged", |b| {
        b.iter(|| portfolio.long_short_purged(black_box(&records), 5))
    });
    group.bench_function("buckets", |b| b.iter(|| portfolio.buckets(black_box(&records))));

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_cross_sectional);
criterion_main!(benches);

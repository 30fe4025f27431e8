//! Look-ahead and partition-leakage tests.
//!
//! Every quantity a training sample sees must be computable from data up to
//! its base date and from the training partition only.

mod common;

use common::*;
use excess_return_pipeline::prelude::*;
use std::collections::BTreeMap;

fn date_range(rows: &[LabeledRow]) -> (chrono::NaiveDate, chrono::NaiveDate) {
    let min = rows.iter().map(|r| r.date()).min().unwrap();
    let max = rows.iter().map(|r| r.date()).max().unwrap();
    (min, max)
}

#[test]
fn test_indicators_are_causal() {
    let panel = trending_panel(1, 80);
    let engine = IndicatorEngine::new(IndicatorConfig::default());

    let full = engine.compute_entity(&panel);
    let prefix = engine.compute_entity(&panel[..40]);

    // row 0 carries NaN RSI, which never compares equal
    assert_eq!(&full[1..40], &prefix[1..]);
}

#[test]
fn test_future_prices_do_not_reach_training_data() {
    let base = trending_panel(12, 120);
    let shocked: Vec<ObservationRow> = base
        .iter()
        .cloned()
        .map(|mut r| {
            if r.date >= date(100) {
                r.close *= 3.0;
            }
            r
        })
        .collect();

    let a = prepare(small_config(), base);
    let b = prepare(small_config(), shocked);

    assert!(date_range(&a.partitions.train).1 < date(97));
    assert_eq!(a.partitions.train, b.partitions.train);
    assert_eq!(a.scalers, b.scalers);
    assert_eq!(a.train.len(), b.train.len());
    for (x, y) in a.train.iter().zip(&b.train) {
        assert_eq!((x.entity_id.as_str(), x.base_date), (y.entity_id.as_str(), y.base_date));
        assert_eq!(x.target, y.target);
        assert_eq!(x.as_flat(), y.as_flat());
    }
}

#[test]
fn test_scalers_fit_on_training_partition() {
    let dataset = prepare(small_config(), trending_panel(12, 120));
    let refit = FittedScalers::fit(&dataset.partitions.train).unwrap();
    assert_eq!(refit, dataset.scalers);

    let with_test: Vec<LabeledRow> = dataset
        .partitions
        .train
        .iter()
        .chain(&dataset.partitions.test)
        .cloned()
        .collect();
    assert_ne!(FittedScalers::fit(&with_test).unwrap(), dataset.scalers);
}

#[test]
fn test_partitions_are_chronological() {
    let dataset = prepare(small_config(), trending_panel(12, 120));
    let p = &dataset.partitions;
    let (_, train_max) = date_range(&p.train);
    let (val_min, val_max) = date_range(&p.validation);
    let (test_min, _) = date_range(&p.test);
    assert!(train_max <= val_min);
    assert!(val_max <= test_min);

    let aligned = small_config().with_split(SplitConfig {
        boundary: BoundaryMode::DateAligned,
        ..SplitConfig::default()
    });
    let dataset = prepare(aligned, trending_panel(12, 120));
    let p = &dataset.partitions;
    assert!(date_range(&p.train).1 < date_range(&p.validation).0);
    assert!(date_range(&p.validation).1 < date_range(&p.test).0);
}

#[test]
fn test_windows_never_cross_partitions() {
    let t = 5;
    let dataset = prepare(small_config(), trending_panel(12, 120));
    let p = &dataset.partitions;

    for (rows, sequences) in [
        (&p.train, &dataset.train),
        (&p.validation, &dataset.validation),
        (&p.test, &dataset.test),
    ] {
        let mut per_entity: BTreeMap<&str, usize> = BTreeMap::new();
        for r in rows.iter() {
            *per_entity.entry(r.entity_id()).or_default() += 1;
        }
        let expected: usize = per_entity.values().map(|&n| n.saturating_sub(t)).sum();
        assert_eq!(sequences.len(), expected);

        let (min, max) = date_range(rows);
        for s in sequences.iter() {
            assert!(s.base_date >= min && s.base_date <= max);
        }
    }
}

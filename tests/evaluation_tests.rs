//! Evaluation Integration Tests
//!
//! Oracle and constant predictors on prepared synthetic panels, plus the
//! cross-sectional evaluators on hand-built records.

mod common;

use chrono::NaiveDate;
use common::*;
use excess_return_pipeline::evaluation::{
    CrossSectionalEvaluator, EvaluationRecord, Period, PortfolioEvaluator,
};
use excess_return_pipeline::model::{predict_in_batches, Prediction};
use excess_return_pipeline::prelude::*;

fn record(entity_id: &str, d: NaiveDate, predicted: f64, realized: f64) -> EvaluationRecord {
    EvaluationRecord {
        entity_id: entity_id.to_string(),
        date: d,
        predicted_excess: predicted,
        realized_excess: realized,
        predicted_probability: 0.5,
        predicted_excess_log: predicted.ln_1p(),
        realized_excess_log: realized.ln_1p(),
        predicted_scaled: predicted,
        realized_scaled: realized,
        market_log: 0.0,
        predicted_raw: predicted,
        realized_raw: realized,
        cls_label: None,
        cls_weight: 0.0,
    }
}

// ============================================================================
// Oracle predictor
// ============================================================================

#[test]
fn test_oracle_predictor_scores_perfectly() {
    let config = small_config();
    let dataset = prepare(config.clone(), trending_panel(12, 120));
    let pipeline = Pipeline::from_config(config).unwrap();
    let report = pipeline.evaluate(&dataset, &oracle_predictor(&dataset)).unwrap();

    assert_eq!(report.predictor, "file");
    assert_eq!(report.n_test, dataset.test.len());

    let r = &report.regression;
    assert!(r.mse < 1e-20);
    assert!(r.r2 > 0.999_999);
    assert!(r.direction_accuracy > 0.99);
    assert!(r.spearman_ic.unwrap() > 0.999);
    assert!(report.baseline.mae > r.mae);

    let ic_mean = report.ic.mean.unwrap();
    assert!(ic_mean > 0.999, "daily IC mean {ic_mean}");
    assert!(!report.ic.monthly.is_empty());
    assert!(!report.ic.quarterly.is_empty());

    let spread = report.long_short.summary.mean.unwrap();
    assert!(spread > 0.0);
    assert_eq!(report.long_short.summary.mean_hit_rate.map(|h| h > 0.5), Some(true));
    assert!(report.long_short_purged.days.len() < report.long_short.days.len());
    assert!(report.buckets.top_minus_bottom.unwrap() > 0.0);

    assert!(!report.threshold.fallback);
    let cls = report.classification.as_ref().unwrap();
    assert!(cls.auc.unwrap() > 0.99);
}

#[test]
fn test_purged_series_steps_by_horizon() {
    let config = small_config();
    let horizon = config.horizon();
    let dataset = prepare(config.clone(), trending_panel(12, 120));
    let pipeline = Pipeline::from_config(config).unwrap();
    let report = pipeline.evaluate(&dataset, &oracle_predictor(&dataset)).unwrap();

    let dates: Vec<NaiveDate> = report.long_short_purged.days.iter().map(|d| d.date).collect();

    let all_dates: std::collections::BTreeSet<NaiveDate> = report.records.iter().map(|r| r.date).collect();
    let expected: Vec<NaiveDate> = all_dates
        .into_iter()
        .step_by(horizon)
        .filter(|d| report.records.iter().filter(|r| r.date == *d).count() >= 10)
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(dates, expected);
    assert!(dates.len() < report.long_short.days.len());
}

// ============================================================================
// Constant predictor
// ============================================================================

#[test]
fn test_constant_predictor_has_no_daily_ic() {
    let config = small_config();
    let dataset = prepare(config.clone(), trending_panel(12, 90));
    let baseline = MeanBaselinePredictor::fit(&dataset.train);
    let report = Pipeline::from_config(config).unwrap().evaluate(&dataset, &baseline).unwrap();

    assert_eq!(report.predictor, "mean-baseline");
    assert!(report.ic.daily.is_empty());
    assert!(report.ic.dates_skipped > 0);
    assert!(report.ic.mean.is_none());
    assert!((report.regression.mae - report.baseline.mae).abs() < 1e-12);
    assert_eq!(report.latest.len(), 12);
}

struct WrongCount;

impl Predictor for WrongCount {
    fn predict_batch(&self, batch: &SequenceBatch) -> excess_return_pipeline::Result<Vec<Prediction>> {
        Ok(vec![Prediction::new(0.0, 0.5); batch.len() + 1])
    }
}

#[test]
fn test_predictor_contract_enforced() {
    let dataset = prepare(small_config(), trending_panel(12, 60));
    let err = predict_in_batches(&WrongCount, &dataset.test, 32).unwrap_err();
    assert!(matches!(err, PipelineError::Predictor(_)));

    let pipeline = Pipeline::from_config(small_config()).unwrap();
    assert!(pipeline.evaluate(&dataset, &WrongCount).is_err());
}

// ============================================================================
// Evaluators on hand-built records
// ============================================================================

#[test]
fn test_daily_ic_and_period_aggregation() {
    let mut records = Vec::new();
    // Jan: perfect ranking, Feb: reversed
    for (day, sign) in [(date(9), 1.0), (date(10), 1.0), (date(40), -1.0), (date(41), -1.0)] {
        for e in 0..5 {
            let realized = e as f64 / 100.0;
            records.push(record(&entity(e), day, sign * realized, realized));
        }
    }
    // one thin date
    records.push(record("X", date(11), 0.1, 0.1));
    records.push(record("Y", date(11), 0.2, 0.2));

    let report = CrossSectionalEvaluator::new(3).evaluate(&records);
    assert_eq!(report.daily.len(), 4);
    assert_eq!(report.dates_skipped, 1);

    let monthly = CrossSectionalEvaluator::aggregate(&report.daily, Period::Month);
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].period, "2024-01");
    assert!((monthly[0].mean - 1.0).abs() < 1e-12);
    assert!((monthly[1].mean + 1.0).abs() < 1e-12);

    let quarterly = CrossSectionalEvaluator::aggregate(&report.daily, Period::Quarter);
    assert_eq!(quarterly.len(), 1);
    assert_eq!(quarterly[0].period, "2024Q1");
    assert!(quarterly[0].mean.abs() < 1e-12);
}

#[test]
fn test_long_short_basket_size_and_spread() {
    let d = date(3);
    // 10 entities, predictions rank them perfectly; k = floor(10 * 0.2) = 2
    let records: Vec<EvaluationRecord> = (0..10)
        .map(|e| record(&entity(e), d, e as f64, (e as f64 - 4.5) / 100.0))
        .collect();

    let report = PortfolioEvaluator::new(0.2, 10, 5).long_short(&records);
    assert_eq!(report.days.len(), 1);
    let day = &report.days[0];
    assert_eq!((day.n, day.k), (10, 2));
    let top = (0.035 + 0.045) / 2.0;
    let bottom = (-0.045 - 0.035) / 2.0;
    assert!((day.spread - (top - bottom)).abs() < 1e-12);
    assert_eq!(day.top_hit, 1.0);

    let thin = PortfolioEvaluator::new(0.2, 10, 5).long_short(&records[..9]);
    assert!(thin.days.is_empty());
    assert_eq!(thin.dates_skipped, 1);
}

#[test]
fn test_bucket_means_ordered_for_perfect_ranking() {
    let d = date(3);
    let records: Vec<EvaluationRecord> = (0..10)
        .map(|e| record(&entity(e), d, e as f64, e as f64 / 100.0))
        .collect();

    let report = PortfolioEvaluator::new(0.2, 10, 5).buckets(&records);
    let means: Vec<f64> = report.mean_by_bucket.iter().map(|m| m.unwrap()).collect();
    assert_eq!(means.len(), 5);
    for pair in means.windows(2) {
        assert!(pair[1] > pair[0]);
    }
    assert!((report.top_minus_bottom.unwrap() - (0.085 - 0.005)).abs() < 1e-12);
}

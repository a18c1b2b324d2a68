//! Look-ahead contamination tests for the windowed reductions and features.
//!
//! Invariant: no value at row t may depend on input from row t+1 or later.
//!
//! Method: compute on a truncated series (rows 0..150) and on the full series
//! (rows 0..300). Rows 0..150 must be bit-identical between both runs. Any
//! difference means future data leaked into past values.

use chrono::NaiveDate;
use stacklab_core::config::FeatureWindows;
use stacklab_core::domain::{DailyRecord, PriceHistory};
use stacklab_core::features::FeatureBuilder;
use stacklab_core::indicators::*;

/// Deterministic pseudo-random walk with a gap of missing values.
fn make_series(n: usize) -> Vec<f64> {
    let mut value = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            value += ((seed >> 33) % 200) as f64 * 0.05 - 5.0;
            value = value.max(10.0);
            if (40..45).contains(&i) {
                f64::NAN
            } else {
                value
            }
        })
        .collect()
}

fn make_history(n: usize) -> PriceHistory {
    let base = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    let prices = make_series(n);
    let records = (0..n)
        .map(|i| {
            let price = if prices[i].is_finite() { prices[i] } else { 50.0 };
            let record = DailyRecord::new(base + chrono::Duration::days(i as i64), price);
            if i < 20 {
                record
            } else {
                record.with_valuation(1.0 + 0.8 * (i as f64 / 31.0).sin() + i as f64 * 0.002)
            }
        })
        .collect();
    PriceHistory::new(records).unwrap()
}

fn test_windows() -> FeatureWindows {
    FeatureWindows {
        ma_window: 30,
        ma_min_periods: 15,
        zscore_window: 60,
        zscore_min_periods: 10,
        percentile_window: 120,
        percentile_min_periods: 30,
        gradient_window: 7,
        acceleration_window: 5,
        volatility_window: 14,
        volatility_min_periods: 7,
    }
}

fn assert_identical_prefix(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        assert!(
            t.to_bits() == f.to_bits() || (t.is_nan() && f.is_nan()),
            "{name}: look-ahead contamination at row {i}: truncated={t}, full={f}"
        );
    }
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[f64], truncated_len: usize) {
    let full_result = indicator.compute(full);
    let truncated_result = indicator.compute(&full[..truncated_len]);

    assert_eq!(
        truncated_result.len(),
        truncated_len,
        "{}: truncated result length mismatch",
        indicator.name()
    );
    assert_eq!(
        full_result.len(),
        full.len(),
        "{}: full result length mismatch",
        indicator.name()
    );
    assert_identical_prefix(indicator.name(), &truncated_result, &full_result[..truncated_len]);
}

#[test]
fn lookahead_sma() {
    let series = make_series(300);
    assert_no_lookahead(&Sma::new(10, 5), &series, 150);
    assert_no_lookahead(&Sma::new(200, 100), &series, 150);
}

#[test]
fn lookahead_rolling_std() {
    let series = make_series(300);
    assert_no_lookahead(&RollingStd::new(20, 5), &series, 150);
    assert_no_lookahead(&RollingStd::new(90, 45), &series, 150);
}

#[test]
fn lookahead_rolling_rank() {
    let series = make_series(300);
    assert_no_lookahead(&RollingRank::new(30, 10), &series, 150);
    assert_no_lookahead(&RollingRank::new(1461, 180), &series, 150);
}

#[test]
fn lookahead_ewm() {
    let series = make_series(300);
    assert_no_lookahead(&Ewm::new(14), &series, 150);
    assert_no_lookahead(&Ewm::new(30), &series, 150);
}

#[test]
fn lookahead_raw_features() {
    let full = make_history(300);
    let truncated = full.truncate_after(full.records()[149].date).unwrap();
    let builder = FeatureBuilder::new(test_windows());

    let f = builder.raw(&full);
    let t = builder.raw(&truncated);
    assert_identical_prefix("price_vs_ma", &t.price_vs_ma, &f.price_vs_ma);
    assert_identical_prefix("valuation_zscore", &t.valuation_zscore, &f.valuation_zscore);
    assert_identical_prefix("valuation_gradient", &t.valuation_gradient, &f.valuation_gradient);
    assert_identical_prefix(
        "valuation_percentile",
        &t.valuation_percentile,
        &f.valuation_percentile,
    );
    assert_identical_prefix(
        "valuation_acceleration",
        &t.valuation_acceleration,
        &f.valuation_acceleration,
    );
    assert_identical_prefix(
        "valuation_volatility",
        &t.valuation_volatility,
        &f.valuation_volatility,
    );
}

#[test]
fn lookahead_feature_rows() {
    let full = make_history(300);
    let truncated = full.truncate_after(full.records()[149].date).unwrap();
    let builder = FeatureBuilder::new(test_windows());

    let f = builder.build(&full);
    let t = builder.build(&truncated);
    assert_eq!(t.len(), 150);
    assert_eq!(t.rows(), &f.rows()[..150]);
}

#[test]
fn feature_row_depends_only_on_earlier_rows() {
    // Changing the record at row k must leave rows 0..=k unchanged: the lag
    // means row k sees data through k-1 only.
    let full = make_history(200);
    let k = 120;
    let mut records = full.records().to_vec();
    records[k].price *= 3.0;
    records[k].valuation_ratio = Some(9.0);
    let shocked = PriceHistory::new(records).unwrap();

    let builder = FeatureBuilder::new(test_windows());
    let a = builder.build(&full);
    let b = builder.build(&shocked);
    assert_eq!(&a.rows()[..=k], &b.rows()[..=k]);
    assert_ne!(a.rows()[k + 1], b.rows()[k + 1]);
}

//! End-to-end scenario: 200 flat days followed by 200 rising days, no
//! valuation ratio, default configuration.
//!
//! A 365-day window starting on day 50 and evaluated as of the last data day
//! (day 399) must lean towards the flat, relatively cheap days and away from
//! the rising ones, while still summing to 1.0.
//!
//! Each locked weight only sees its own and earlier multipliers. The flat days
//! all carry the neutral multiplier, so each one gets exactly the uniform
//! share; the tilt shows up as every rising day getting less than that, and
//! the flat days taking more than their uniform share of the spent budget.

use chrono::{Duration, NaiveDate};
use stacklab_core::config::ModelConfig;
use stacklab_core::domain::{DailyRecord, PriceHistory};
use stacklab_core::features::SignalMode;
use stacklab_core::window::WeightModel;

const FLAT_PRICE: f64 = 10_000.0;
const DAILY_RISE: f64 = 50.0;
const WINDOW_DAYS: usize = 365;

fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap() + Duration::days(i)
}

fn flat_then_rising() -> PriceHistory {
    let records = (0..400)
        .map(|i| {
            let price = if i < 200 {
                FLAT_PRICE
            } else {
                FLAT_PRICE + DAILY_RISE * (i - 199) as f64
            };
            DailyRecord::new(day(i), price)
        })
        .collect();
    PriceHistory::new(records).unwrap()
}

#[test]
fn flat_days_are_favoured_over_rising_days() {
    let model = WeightModel::new(flat_then_rising(), ModelConfig::default()).unwrap();
    assert_eq!(model.mode(), SignalMode::PriceOnly);

    let start = day(50);
    let end = day(50 + WINDOW_DAYS as i64 - 1);
    let w = model.compute_window_weights(start, end, day(399)).unwrap();
    assert_eq!(w.len(), WINDOW_DAYS);
    assert!((w.sum() - 1.0).abs() < 1e-6);

    let uniform = 1.0 / WINDOW_DAYS as f64;
    // Days 50..=200 see only flat history (the lag puts day 200's first rise
    // into day 201's features).
    let flat = &w.weights[..=150];
    let rising = &w.weights[151..=349];

    for (i, &x) in rising.iter().enumerate() {
        assert!(x < uniform, "rising day {} got {x} >= uniform {uniform}", 201 + i);
    }
    for &x in flat {
        assert!((x - uniform).abs() < 1e-15, "flat day got {x}, uniform {uniform}");
        assert!(rising.iter().all(|&r| r < x));
    }

    // Of the budget spent so far, the flat days took more than their uniform share.
    let flat_sum: f64 = flat.iter().sum();
    let spent: f64 = w.locked().iter().sum();
    let flat_share = flat_sum / spent;
    let uniform_share = flat.len() as f64 / w.locked().len() as f64;
    assert!(
        flat_share > uniform_share,
        "flat share {flat_share} not above uniform share {uniform_share}"
    );
}

#[test]
fn rising_prices_reduce_the_multiplier() {
    let model = WeightModel::new(flat_then_rising(), ModelConfig::default()).unwrap();
    let m = model.multipliers(day(50), day(414), day(399)).unwrap();
    assert!(m[..=150].iter().all(|&x| x == 1.0));
    assert!(m[151..=349].iter().all(|&x| x < 1.0));
    assert!(m[350..].iter().all(|&x| x == 1.0));
}

#[test]
fn unspent_budget_is_split_over_the_remaining_days() {
    let model = WeightModel::new(flat_then_rising(), ModelConfig::default()).unwrap();
    let w = model.compute_window_weights(day(50), day(414), day(399)).unwrap();
    let future = w.future();
    assert_eq!(future.len(), 15);
    let uniform = 1.0 / WINDOW_DAYS as f64;
    assert!(future.iter().all(|&x| x > uniform));
}

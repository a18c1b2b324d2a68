//! Windowed reductions used by the feature builder.
//!
//! All indicators implement the `Indicator` trait: series in, equal-length
//! series out, with NaN during warmup. They are precomputed once over the full
//! history and never recomputed per window.
//!
//! # Look-ahead contamination guard
//! No output at row t may depend on input from row t+1 or later. Every
//! indicator must pass the truncated-vs-full series test.

pub mod ema;
pub mod rank;
pub mod rolling;
pub mod sma;
pub mod std_dev;

pub use ema::{ewm_of_series, Ewm};
pub use rank::RollingRank;
pub use rolling::Rolling;
pub use sma::Sma;
pub use std_dev::RollingStd;

/// Trait for series indicators.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_200", "rank_1461").
    fn name(&self) -> &str;

    /// Number of rows needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    ///
    /// Returns a `Vec<f64>` of the same length as `values`.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// `values[t] - values[t - lag]`, NaN where unavailable.
pub fn diff(values: &[f64], lag: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if lag == 0 {
                0.0
            } else if i >= lag {
                v - values[i - lag]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Shift a series forward by `periods` rows; the first rows become NaN.
pub fn lag(values: &[f64], periods: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if periods < n {
        result[periods..].copy_from_slice(&values[..n - periods]);
    }
    result
}

/// Replace non-finite entries with `neutral`.
pub fn fill_non_finite(values: &mut [f64], neutral: f64) {
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = neutral;
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_with_lag() {
        let out = diff(&[1.0, 3.0, 6.0, 10.0], 2);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 5.0, DEFAULT_EPSILON);
        assert_approx(out[3], 7.0, DEFAULT_EPSILON);
    }

    #[test]
    fn lag_shifts_forward() {
        let out = lag(&[1.0, 2.0, 3.0], 1);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.0, 2.0]);
        assert!(lag(&[1.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn fill_replaces_only_non_finite() {
        let mut v = vec![f64::NAN, 1.0, f64::INFINITY];
        fill_non_finite(&mut v, 0.5);
        assert_eq!(v, vec![0.5, 1.0, 0.5]);
    }
}

//! Simple Moving Average (SMA).
//!
//! Rolling mean over a trailing window with a minimum-sample threshold.
//! Lookback: min_periods - 1 (first valid value once min_periods samples exist).

use super::rolling::Rolling;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    rolling: Rolling,
    name: String,
}

impl Sma {
    pub fn new(period: usize, min_periods: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            rolling: Rolling::new(period, min_periods),
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.rolling.min_periods().saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        self.rolling.mean(values)
    }
}

//! Rolling sample standard deviation.

use super::rolling::Rolling;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingStd {
    rolling: Rolling,
    name: String,
}

impl RollingStd {
    pub fn new(period: usize, min_periods: usize) -> Self {
        Self {
            rolling: Rolling::new(period, min_periods.max(2)),
            name: format!("std_{period}"),
        }
    }
}

impl Indicator for RollingStd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.rolling.min_periods() - 1
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        self.rolling.std(values)
    }
}

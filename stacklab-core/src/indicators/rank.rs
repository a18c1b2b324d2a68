//! Rolling rank-percentile: where the current value sits within its trailing window.

use super::rolling::Rolling;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingRank {
    rolling: Rolling,
    name: String,
}

impl RollingRank {
    pub fn new(period: usize, min_periods: usize) -> Self {
        Self {
            rolling: Rolling::new(period, min_periods),
            name: format!("rank_{period}"),
        }
    }
}

impl Indicator for RollingRank {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.rolling.min_periods().saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        self.rolling.rank_pct(values)
    }
}

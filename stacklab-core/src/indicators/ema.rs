//! Exponentially weighted mean (EWM).
//!
//! Recursive: EWM[t] = alpha * x[t] + (1 - alpha) * EWM[t-1], alpha = 2 / (span + 1).
//! Seed: the first finite value. A NaN input yields NaN at that row and leaves
//! the running state untouched, so later rows keep smoothing from the last
//! finite observation.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ewm {
    span: usize,
    name: String,
}

impl Ewm {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EWM span must be >= 1");
        Self {
            span,
            name: format!("ewm_{span}"),
        }
    }
}

impl Indicator for Ewm {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        ewm_of_series(values, self.span)
    }
}

/// Compute EWM values from a raw f64 slice.
pub fn ewm_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if span == 0 {
        return result;
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut state: Option<f64> = None;
    for (slot, &v) in result.iter_mut().zip(values) {
        if !v.is_finite() {
            continue;
        }
        let next = match state {
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
            None => v,
        };
        state = Some(next);
        *slot = next;
    }

    result
}

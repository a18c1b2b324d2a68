//! Trailing-window reduction over an ordered series.
//!
//! Every reduction at row `i` sees only rows `i + 1 - window ..= i`, so a
//! value never depends on later rows. Non-finite inputs are skipped; rows with
//! fewer than `min_periods` finite values in the window produce NaN.

/// Trailing window shape shared by all rolling features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rolling {
    window: usize,
    min_periods: usize,
}

impl Rolling {
    pub fn new(window: usize, min_periods: usize) -> Self {
        assert!(window >= 1, "rolling window must be >= 1");
        Self {
            window,
            min_periods: min_periods.clamp(1, window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// Apply `reduce(finite_window_values, current_value)` at every row.
    pub fn apply<F>(&self, values: &[f64], reduce: F) -> Vec<f64>
    where
        F: Fn(&[f64], f64) -> f64,
    {
        let mut result = vec![f64::NAN; values.len()];
        let mut buf: Vec<f64> = Vec::with_capacity(self.window);

        for (i, slot) in result.iter_mut().enumerate() {
            let start = (i + 1).saturating_sub(self.window);
            buf.clear();
            buf.extend(values[start..=i].iter().copied().filter(|v| v.is_finite()));
            if buf.len() >= self.min_periods {
                *slot = reduce(&buf, values[i]);
            }
        }

        result
    }

    pub fn mean(&self, values: &[f64]) -> Vec<f64> {
        self.apply(values, |w, _| mean(w))
    }

    pub fn std(&self, values: &[f64]) -> Vec<f64> {
        self.apply(values, |w, _| sample_std(w))
    }

    /// Percentile rank of the current value within its trailing window, in (0, 1].
    pub fn rank_pct(&self, values: &[f64]) -> Vec<f64> {
        self.apply(values, rank_pct)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1). NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Average-rank percentile of `current` among `window` (which contains it).
pub fn rank_pct(window: &[f64], current: f64) -> f64 {
    if !current.is_finite() || window.is_empty() {
        return f64::NAN;
    }
    let less = window.iter().filter(|&&v| v < current).count() as f64;
    let equal = window.iter().filter(|&&v| v == current).count() as f64;
    (less + (equal + 1.0) / 2.0) / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_respects_min_periods() {
        let r = Rolling::new(3, 2);
        let out = r.mean(&[1.0, 2.0, 3.0, 4.0]);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.5, DEFAULT_EPSILON);
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_inputs_are_skipped() {
        let r = Rolling::new(3, 2);
        let out = r.mean(&[1.0, f64::NAN, 3.0, f64::NAN, f64::NAN]);
        assert!(out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert!(out[4].is_nan()); // only one finite value in [3.0, NaN, NaN]
    }

    #[test]
    fn std_is_sample_std() {
        let r = Rolling::new(4, 4);
        let out = r.std(&[2.0, 4.0, 4.0, 6.0]);
        // mean 4, ss = 4 + 0 + 0 + 4 = 8, var = 8/3
        assert_approx(out[3], (8.0_f64 / 3.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rank_pct_extremes_and_ties() {
        assert_approx(rank_pct(&[1.0, 2.0, 3.0, 4.0], 4.0), 1.0, DEFAULT_EPSILON);
        assert_approx(rank_pct(&[1.0, 2.0, 3.0, 4.0], 1.0), 0.25, DEFAULT_EPSILON);
        // ties share the average rank: ranks 1..=4 average to 2.5
        assert_approx(rank_pct(&[5.0, 5.0, 5.0, 5.0], 5.0), 0.625, DEFAULT_EPSILON);
        assert!(rank_pct(&[1.0], f64::NAN).is_nan());
    }

    #[test]
    fn rolling_rank_uses_trailing_window_only() {
        let r = Rolling::new(2, 1);
        let out = r.rank_pct(&[3.0, 1.0, 2.0]);
        assert_approx(out[0], 1.0, DEFAULT_EPSILON);
        assert_approx(out[1], 0.5, DEFAULT_EPSILON);
        assert_approx(out[2], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn min_periods_clamped_to_window() {
        let r = Rolling::new(3, 10);
        assert_eq!(r.min_periods(), 3);
        assert_eq!(Rolling::new(3, 0).min_periods(), 1);
    }
}

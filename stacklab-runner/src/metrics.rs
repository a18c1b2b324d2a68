//! Accumulation metrics: pure functions over per-window prices and weights.
//!
//! Every metric is a pure function: prices and/or weights in, scalar out.
//! No dependencies on the driver, data loading or the engine.

use serde::{Deserialize, Serialize};

/// Satoshis per unit of currency.
pub const SATS_PER_COIN: f64 = 1e8;

/// Sats-per-dollar outcome of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSpd {
    /// Uniform DCA: `mean(1e8 / price)`.
    pub uniform_spd: f64,
    /// Weighted: `sum(weight * 1e8 / price)`.
    pub dynamic_spd: f64,
    /// All-in on the most expensive day.
    pub min_spd: f64,
    /// All-in on the cheapest day.
    pub max_spd: f64,
    pub uniform_percentile: f64,
    pub dynamic_percentile: f64,
    /// `dynamic_percentile - uniform_percentile`.
    pub excess_percentile: f64,
    /// `(dynamic / uniform - 1) * 100`.
    pub relative_improvement_pct: f64,
    /// `dynamic / uniform`.
    pub ratio: f64,
}

impl WindowSpd {
    /// Evaluate one window. `prices` and `weights` are aligned day by day.
    pub fn compute(prices: &[f64], weights: &[f64]) -> Self {
        debug_assert_eq!(prices.len(), weights.len());
        let spd: Vec<f64> = prices.iter().map(|p| SATS_PER_COIN / p).collect();

        let uniform_spd = mean(&spd);
        let dynamic_spd: f64 = spd.iter().zip(weights).map(|(s, w)| s * w).sum();
        let min_spd = min(&spd);
        let max_spd = max(&spd);

        let uniform_percentile = spd_percentile(uniform_spd, min_spd, max_spd);
        let dynamic_percentile = spd_percentile(dynamic_spd, min_spd, max_spd);
        let ratio = if uniform_spd > 0.0 {
            dynamic_spd / uniform_spd
        } else {
            1.0
        };

        Self {
            uniform_spd,
            dynamic_spd,
            min_spd,
            max_spd,
            uniform_percentile,
            dynamic_percentile,
            excess_percentile: dynamic_percentile - uniform_percentile,
            relative_improvement_pct: (ratio - 1.0) * 100.0,
            ratio,
        }
    }

    pub fn is_win(&self) -> bool {
        self.dynamic_percentile > self.uniform_percentile
    }
}

/// Position of `spd` inside `[min, max]`, in [0, 100]; 50 for a flat window.
pub fn spd_percentile(spd: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.is_nan() || range <= 0.0 || !spd.is_finite() {
        return 50.0;
    }
    ((spd - min) / range * 100.0).clamp(0.0, 100.0)
}

/// Min / max / mean / median of one per-window quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpdStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl SpdStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            min: min(values),
            max: max(values),
            mean: mean(values),
            median: median(values),
        }
    }
}

/// Aggregate over every evaluated window of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub window_count: usize,
    pub dynamic_spd: SpdStats,
    pub uniform_spd: SpdStats,
    pub dynamic_percentile: SpdStats,
    pub uniform_percentile: SpdStats,
    /// Recency-weighted mean of the dynamic percentile, in [0, 100].
    pub exp_decay_avg_percentile: f64,
    pub win_rate: f64,
    pub win_count: usize,
    pub loss_count: usize,
    /// `0.5 * win_rate + 0.5 * exp_decay_avg_percentile / 100`.
    pub model_score: f64,
    pub mean_excess_percentile: f64,
    pub median_excess_percentile: f64,
    pub mean_relative_improvement_pct: f64,
    pub median_relative_improvement_pct: f64,
    pub mean_ratio: f64,
    pub median_ratio: f64,
}

impl MetricsSummary {
    /// Aggregate windows given in chronological order (latest last).
    pub fn compute(windows: &[WindowSpd], recency_decay: f64) -> Self {
        let dynamic_pct = column(windows, |w| w.dynamic_percentile);
        let excess = column(windows, |w| w.excess_percentile);
        let improvement = column(windows, |w| w.relative_improvement_pct);
        let ratio = column(windows, |w| w.ratio);

        let window_count = windows.len();
        let win_count = windows.iter().filter(|w| w.is_win()).count();
        let win_rate = if window_count > 0 {
            win_count as f64 / window_count as f64
        } else {
            0.0
        };
        let exp_decay_avg_percentile = exp_decay_average(&dynamic_pct, recency_decay);

        Self {
            window_count,
            dynamic_spd: SpdStats::from_values(&column(windows, |w| w.dynamic_spd)),
            uniform_spd: SpdStats::from_values(&column(windows, |w| w.uniform_spd)),
            dynamic_percentile: SpdStats::from_values(&dynamic_pct),
            uniform_percentile: SpdStats::from_values(&column(windows, |w| w.uniform_percentile)),
            exp_decay_avg_percentile,
            win_rate,
            win_count,
            loss_count: window_count - win_count,
            model_score: model_score(win_rate, exp_decay_avg_percentile),
            mean_excess_percentile: mean(&excess),
            median_excess_percentile: median(&excess),
            mean_relative_improvement_pct: mean(&improvement),
            median_relative_improvement_pct: median(&improvement),
            mean_ratio: mean(&ratio),
            median_ratio: median(&ratio),
        }
    }
}

fn column(windows: &[WindowSpd], f: impl Fn(&WindowSpd) -> f64) -> Vec<f64> {
    windows.iter().map(f).collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// `0.5 * win_rate + 0.5 * (percentile / 100)`.
pub fn model_score(win_rate: f64, exp_decay_avg_percentile: f64) -> f64 {
    0.5 * win_rate + 0.5 * (exp_decay_avg_percentile / 100.0)
}

/// Weighted mean with weight `decay^(N-1-j)` for value `j` of `N`: the most
/// recent value weighs 1.
pub fn exp_decay_average(values: &[f64], decay: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (j, v) in values.iter().enumerate() {
        let w = decay.powi((n - 1 - j) as i32);
        weighted += w * v;
        total += w;
    }
    if total > 0.0 {
        weighted / total
    } else {
        mean(values)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

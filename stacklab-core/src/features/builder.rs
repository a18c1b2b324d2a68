//! Feature builder: raw daily records in, lagged feature rows out.

use super::{FeatureRow, FeatureSet, NEUTRAL_PERCENTILE, NEUTRAL_SIGNED};
use crate::config::FeatureWindows;
use crate::domain::PriceHistory;
use crate::indicators::{
    diff, ewm_of_series, fill_non_finite, lag, Indicator, Rolling, RollingRank, RollingStd, Sma,
};

const PRICE_VS_MA_BOUND: f64 = 1.0;
const ZSCORE_BOUND: f64 = 4.0;
const GRADIENT_GAIN: f64 = 2.0;
const ACCELERATION_GAIN: f64 = 3.0;

/// Raw (unlagged, unfilled) feature series. A value at row t uses rows <= t.
#[derive(Debug, Clone)]
pub struct RawFeatures {
    pub price_vs_ma: Vec<f64>,
    pub valuation_zscore: Vec<f64>,
    pub valuation_gradient: Vec<f64>,
    pub valuation_percentile: Vec<f64>,
    pub valuation_acceleration: Vec<f64>,
    pub valuation_volatility: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    windows: FeatureWindows,
}

impl FeatureBuilder {
    pub fn new(windows: FeatureWindows) -> Self {
        Self { windows }
    }

    /// Compute the causal, unlagged feature series.
    pub fn raw(&self, history: &PriceHistory) -> RawFeatures {
        let w = &self.windows;
        let prices = history.prices();
        let ratios = history.valuation_ratios();

        let ma = Sma::new(w.ma_window, w.ma_min_periods).compute(&prices);
        let price_vs_ma = prices
            .iter()
            .zip(&ma)
            .map(|(p, m)| bounded(p / m - 1.0, PRICE_VS_MA_BOUND))
            .collect();

        let z_mean = Rolling::new(w.zscore_window, w.zscore_min_periods).mean(&ratios);
        let z_std = RollingStd::new(w.zscore_window, w.zscore_min_periods).compute(&ratios);
        let valuation_zscore: Vec<f64> = ratios
            .iter()
            .zip(z_mean.iter().zip(&z_std))
            .map(|(v, (m, s))| bounded((v - m) / s, ZSCORE_BOUND))
            .collect();

        let valuation_gradient = smoothed_tanh(
            &valuation_zscore,
            w.gradient_window,
            GRADIENT_GAIN,
        );
        let valuation_acceleration = smoothed_tanh(
            &valuation_gradient,
            w.acceleration_window,
            ACCELERATION_GAIN,
        );

        let cycle_rank = RollingRank::new(w.percentile_window, w.percentile_min_periods);
        let valuation_percentile = cycle_rank.compute(&ratios);

        let z_dispersion = RollingStd::new(w.volatility_window, w.volatility_min_periods)
            .compute(&valuation_zscore);
        let valuation_volatility = cycle_rank.compute(&z_dispersion);

        RawFeatures {
            price_vs_ma,
            valuation_zscore,
            valuation_gradient,
            valuation_percentile,
            valuation_acceleration,
            valuation_volatility,
        }
    }

    /// Build the full feature set: raw features, one-row lag, then neutral fill.
    pub fn build(&self, history: &PriceHistory) -> FeatureSet {
        let valuation_since = history.first_valuation_date();
        match valuation_since {
            None => tracing::warn!(
                records = history.len(),
                "valuation_ratio absent from the whole history; running price-only signal"
            ),
            Some(first) if first > history.first_date() => tracing::info!(
                %first,
                "valuation_ratio starts late; rows up to {first} use the price-only signal"
            ),
            Some(_) => {}
        }

        let raw = self.raw(history);
        let price_vs_ma = lag_and_fill(&raw.price_vs_ma, NEUTRAL_SIGNED);
        let zscore = lag_and_fill(&raw.valuation_zscore, NEUTRAL_SIGNED);
        let gradient = lag_and_fill(&raw.valuation_gradient, NEUTRAL_SIGNED);
        let percentile = lag_and_fill(&raw.valuation_percentile, NEUTRAL_PERCENTILE);
        let acceleration = lag_and_fill(&raw.valuation_acceleration, NEUTRAL_SIGNED);
        let volatility = lag_and_fill(&raw.valuation_volatility, NEUTRAL_PERCENTILE);

        let rows = (0..history.len())
            .map(|i| {
                FeatureRow::from_lagged(
                    price_vs_ma[i],
                    zscore[i],
                    gradient[i],
                    percentile[i],
                    acceleration[i],
                    volatility[i],
                )
            })
            .collect();
        let dates = history.records().iter().map(|r| r.date).collect();

        FeatureSet::new(dates, rows, valuation_since)
    }
}

/// Clip to `[-bound, bound]`; non-finite inputs stay missing (NaN).
fn bounded(v: f64, bound: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-bound, bound)
    } else {
        f64::NAN
    }
}

/// `tanh(gain * ewm(diff(series, window), span = window))`.
fn smoothed_tanh(series: &[f64], window: usize, gain: f64) -> Vec<f64> {
    ewm_of_series(&diff(series, window), window)
        .into_iter()
        .map(|v| (gain * v).tanh())
        .collect()
}

fn lag_and_fill(series: &[f64], neutral: f64) -> Vec<f64> {
    let mut lagged = lag(series, 1);
    fill_non_finite(&mut lagged, neutral);
    lagged
}

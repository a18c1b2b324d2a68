//! Signal composer: one feature row in, one combined signal and multiplier out.
//!
//! The composition runs in a fixed order: value, MA and percentile signals,
//! their weighted sum, then the acceleration, confidence and volatility
//! modifiers, and finally the clipped exponential.

pub mod boost;
pub mod modifiers;

pub use boost::{extreme_boost, value_signal};
pub use modifiers::{
    acceleration_modifier, confidence_boost, trend_modifier, volatility_dampening,
};

use crate::config::{ModelConfig, SignalWeights};
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};

/// Bound on the combined signal before and after the strength scale.
pub const SIGNAL_CLIP: f64 = 4.0;

/// Multiplier used whenever the composition degenerates to a non-finite value.
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Every intermediate term of one composition, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub value_signal: f64,
    pub trend_modifier: f64,
    pub ma_signal: f64,
    pub pct_signal: f64,
    /// Weighted sum before any modifier.
    pub combined_raw: f64,
    pub acceleration_mod: f64,
    pub confidence_mod: f64,
    pub volatility_mod: f64,
    /// Fully modified combined signal.
    pub combined: f64,
    pub multiplier: f64,
}

/// `sign(0.5 - p) * |2 (0.5 - p)|^1.5`.
pub fn percentile_signal(percentile: f64) -> f64 {
    let d = 0.5 - percentile;
    d.signum() * (2.0 * d).abs().powf(1.5)
}

/// `exp(clip(clip(combined, ±4) * strength, ±4))`, neutral when non-finite.
pub fn dynamic_multiplier(combined: f64, strength: f64) -> f64 {
    let scaled = (combined.clamp(-SIGNAL_CLIP, SIGNAL_CLIP) * strength)
        .clamp(-SIGNAL_CLIP, SIGNAL_CLIP);
    let m = scaled.exp();
    if m.is_finite() {
        m
    } else {
        NEUTRAL_MULTIPLIER
    }
}

/// Compose one row with explicit signal weights.
pub fn compose_with(row: &FeatureRow, weights: SignalWeights, config: &ModelConfig) -> SignalBreakdown {
    let value = value_signal(row.valuation_zscore);
    let trend = trend_modifier(row.valuation_zone, row.valuation_gradient);
    let ma = -row.price_vs_ma * trend;
    let pct = percentile_signal(row.valuation_percentile);

    let combined_raw = value * weights.value + ma * weights.ma + pct * weights.percentile;

    let acceleration_mod = acceleration_modifier(row.valuation_acceleration, row.valuation_gradient);
    let confidence_mod = confidence_boost(row.signal_confidence, &config.confidence);
    let volatility_mod = volatility_dampening(row.valuation_volatility, &config.volatility);
    let combined = combined_raw * acceleration_mod * confidence_mod * volatility_mod;

    SignalBreakdown {
        value_signal: value,
        trend_modifier: trend,
        ma_signal: ma,
        pct_signal: pct,
        combined_raw,
        acceleration_mod,
        confidence_mod,
        volatility_mod,
        combined,
        multiplier: dynamic_multiplier(combined, config.strength),
    }
}

//! Multiplicative modifiers applied around the weighted signal combination.

use crate::config::ModifierConfig;
use crate::features::ValuationZone;

const TREND_MAX_AMPLIFY: f64 = 1.5;
const TREND_MAX_DAMPEN: f64 = 0.3;
const ACCELERATION_MAX_EFFECT: f64 = 0.15;

/// Gradient sensitivity threshold for the zone.
pub fn trend_threshold(zone: ValuationZone) -> f64 {
    match zone {
        ValuationZone::DeepValue | ValuationZone::Value => 0.1,
        ValuationZone::Danger => 0.4,
        ValuationZone::Neutral | ValuationZone::Caution => 0.2,
    }
}

/// Scale factor for the moving-average signal, in [0.3, 1.5].
///
/// Neutral inside `[-threshold, threshold]`; beyond it ramps linearly towards
/// 1.5 at gradient = +1 or 0.3 at gradient = -1.
pub fn trend_modifier(zone: ValuationZone, gradient: f64) -> f64 {
    let threshold = trend_threshold(zone);
    let span = 1.0 - threshold;
    if gradient > threshold {
        let t = ((gradient - threshold) / span).min(1.0);
        1.0 + (TREND_MAX_AMPLIFY - 1.0) * t
    } else if gradient < -threshold {
        let t = ((-gradient - threshold) / span).min(1.0);
        1.0 - (1.0 - TREND_MAX_DAMPEN) * t
    } else {
        1.0
    }
}

/// Amplify when acceleration agrees with the gradient, dampen on reversal.
/// Range [0.85, 1.15].
pub fn acceleration_modifier(acceleration: f64, gradient: f64) -> f64 {
    if acceleration == 0.0 || gradient == 0.0 || !acceleration.is_finite() {
        return 1.0;
    }
    let magnitude = ACCELERATION_MAX_EFFECT * acceleration.abs().min(1.0);
    if acceleration.signum() == gradient.signum() {
        1.0 + magnitude
    } else {
        1.0 - magnitude
    }
}

/// 1.0 up to the threshold, then linear up to `1 + max_effect` at confidence 1.
pub fn confidence_boost(confidence: f64, cfg: &ModifierConfig) -> f64 {
    if confidence > cfg.threshold {
        let t = ((confidence - cfg.threshold) / (1.0 - cfg.threshold)).min(1.0);
        1.0 + cfg.max_effect * t
    } else {
        1.0
    }
}

/// 1.0 up to the threshold, then linear down to `1 - max_effect` at volatility 1.
pub fn volatility_dampening(volatility: f64, cfg: &ModifierConfig) -> f64 {
    if volatility > cfg.threshold {
        let t = ((volatility - cfg.threshold) / (1.0 - cfg.threshold)).min(1.0);
        1.0 - cfg.max_effect * t
    } else {
        1.0
    }
}

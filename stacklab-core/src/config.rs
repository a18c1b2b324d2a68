//! Model configuration: signal weights, rolling windows, modifiers, allocation policy.
//!
//! Every field has a documented default, so a partial TOML table is valid.
//! `validate()` runs at load time, before any computation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Configuration rejected at load time.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("signal weights must sum to 1.0 (value={value}, ma={ma}, percentile={percentile}, sum={sum})")]
    WeightsDoNotSumToOne {
        value: f64,
        ma: f64,
        percentile: f64,
        sum: f64,
    },

    #[error("signal weight '{name}' must be finite and non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("window '{name}' must be positive")]
    NonPositiveWindow { name: &'static str },

    #[error("min periods for '{name}' ({min_periods}) exceeds its window ({window})")]
    MinPeriodsExceedWindow {
        name: &'static str,
        min_periods: usize,
        window: usize,
    },

    #[error("parameter '{name}' out of range: {value} (expected {expected})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Weights of the value / moving-average / percentile signals. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub value: f64,
    pub ma: f64,
    pub percentile: f64,
}

impl SignalWeights {
    /// Single-signal configuration for histories without a valuation ratio.
    pub fn price_only() -> Self {
        Self {
            value: 0.0,
            ma: 1.0,
            percentile: 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.value + self.ma + self.percentile
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            value: 0.70,
            ma: 0.20,
            percentile: 0.10,
        }
    }
}

/// Rolling-window lengths (in rows) used by the feature builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWindows {
    pub ma_window: usize,
    pub ma_min_periods: usize,
    pub zscore_window: usize,
    pub zscore_min_periods: usize,
    /// Valuation cycle window (~4 years).
    pub percentile_window: usize,
    pub percentile_min_periods: usize,
    pub gradient_window: usize,
    pub acceleration_window: usize,
    pub volatility_window: usize,
    pub volatility_min_periods: usize,
}

impl Default for FeatureWindows {
    fn default() -> Self {
        Self {
            ma_window: 200,
            ma_min_periods: 100,
            zscore_window: 365,
            zscore_min_periods: 30,
            percentile_window: 1461,
            percentile_min_periods: 180,
            gradient_window: 30,
            acceleration_window: 14,
            volatility_window: 90,
            volatility_min_periods: 45,
        }
    }
}

/// Activation threshold and maximum effect of a multiplicative modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierConfig {
    pub threshold: f64,
    pub max_effect: f64,
}

/// How realized multipliers are turned into per-day signal ratios.
///
/// The ratio for day `i` may only read multipliers `0..=i` of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// `m_i / mean(m_0..=m_i)`, clamped to `[1/max_ratio, max_ratio]`.
    PrefixMean { max_ratio: f64 },
    /// `m_i` clamped to `[1/max_ratio, max_ratio]`.
    Absolute { max_ratio: f64 },
}

impl NormalizationPolicy {
    pub fn max_ratio(&self) -> f64 {
        match *self {
            Self::PrefixMean { max_ratio } | Self::Absolute { max_ratio } => max_ratio,
        }
    }
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self::PrefixMean { max_ratio: 4.0 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub weights: SignalWeights,
    /// Scale applied to the clipped combined signal before exponentiation.
    pub strength: f64,
    pub windows: FeatureWindows,
    /// Floor applied to every daily weight (MIN_W).
    pub min_weight: f64,
    pub confidence: ModifierConfig,
    pub volatility: ModifierConfig,
    pub normalization: NormalizationPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            strength: 1.0,
            windows: FeatureWindows::default(),
            min_weight: 1e-6,
            confidence: ModifierConfig {
                threshold: 0.7,
                max_effect: 0.15,
            },
            volatility: ModifierConfig {
                threshold: 0.8,
                max_effect: 0.2,
            },
            normalization: NormalizationPolicy::default(),
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [("value", w.value), ("ma", w.ma), ("percentile", w.percentile)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne {
                value: w.value,
                ma: w.ma,
                percentile: w.percentile,
                sum: w.sum(),
            });
        }

        let win = &self.windows;
        let windows = [
            ("ma_window", win.ma_window, Some(win.ma_min_periods)),
            ("zscore_window", win.zscore_window, Some(win.zscore_min_periods)),
            (
                "percentile_window",
                win.percentile_window,
                Some(win.percentile_min_periods),
            ),
            ("gradient_window", win.gradient_window, None),
            ("acceleration_window", win.acceleration_window, None),
            (
                "volatility_window",
                win.volatility_window,
                Some(win.volatility_min_periods),
            ),
        ];
        for (name, window, min_periods) in windows {
            if window == 0 {
                return Err(ConfigError::NonPositiveWindow { name });
            }
            if let Some(min_periods) = min_periods {
                if min_periods > window {
                    return Err(ConfigError::MinPeriodsExceedWindow {
                        name,
                        min_periods,
                        window,
                    });
                }
            }
        }

        check_range("strength", self.strength, "> 0", |v| v > 0.0)?;
        check_range("min_weight", self.min_weight, "in (0, 1)", |v| {
            v > 0.0 && v < 1.0
        })?;
        check_range(
            "confidence.threshold",
            self.confidence.threshold,
            "in [0, 1)",
            |v| (0.0..1.0).contains(&v),
        )?;
        check_range(
            "confidence.max_effect",
            self.confidence.max_effect,
            ">= 0",
            |v| v >= 0.0,
        )?;
        check_range(
            "volatility.threshold",
            self.volatility.threshold,
            "in [0, 1)",
            |v| (0.0..1.0).contains(&v),
        )?;
        check_range(
            "volatility.max_effect",
            self.volatility.max_effect,
            "in [0, 1)",
            |v| (0.0..1.0).contains(&v),
        )?;
        check_range(
            "normalization.max_ratio",
            self.normalization.max_ratio(),
            ">= 1",
            |v| v >= 1.0,
        )?;
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the serialized config.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn check_range(
    name: &'static str,
    value: f64,
    expected: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}

//! Valuation zones: five ordered bands of the valuation z-score.

use serde::{Deserialize, Serialize};

pub const DEEP_VALUE_BELOW: f64 = -2.0;
pub const VALUE_BELOW: f64 = -1.0;
pub const CAUTION_FROM: f64 = 1.5;
pub const DANGER_FROM: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationZone {
    DeepValue,
    Value,
    Neutral,
    Caution,
    Danger,
}

impl ValuationZone {
    /// Classify a z-score. Lower bounds are inclusive; NaN maps to `Neutral`.
    pub fn classify(z: f64) -> Self {
        if z < DEEP_VALUE_BELOW {
            Self::DeepValue
        } else if z < VALUE_BELOW {
            Self::Value
        } else if z >= DANGER_FROM {
            Self::Danger
        } else if z >= CAUTION_FROM {
            Self::Caution
        } else {
            Self::Neutral
        }
    }
}

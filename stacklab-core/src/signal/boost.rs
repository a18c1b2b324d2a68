//! Asymmetric extreme boost of the valuation z-score.
//!
//! Positive (buy more) in the value zones, negative in caution/danger, zero in
//! the neutral band. Continuous at every zone boundary:
//!
//! | zone        | z range        | boost                    |
//! |-------------|----------------|--------------------------|
//! | deep value  | z < -2.0       | 0.8·(z+2)² + 0.5         |
//! | value       | [-2.0, -1.0)   | -0.5·(z+1)               |
//! | neutral     | [-1.0, 1.5)    | 0                        |
//! | caution     | [1.5, 2.5)     | -0.3·(z-1.5)             |
//! | danger      | z >= 2.5       | -0.5·(z-2.5)² - 0.3      |

use crate::features::zone::{CAUTION_FROM, DANGER_FROM, DEEP_VALUE_BELOW, VALUE_BELOW};

pub fn extreme_boost(z: f64) -> f64 {
    if z < DEEP_VALUE_BELOW {
        let d = z - DEEP_VALUE_BELOW;
        0.8 * d * d + 0.5
    } else if z < VALUE_BELOW {
        -0.5 * (z - VALUE_BELOW)
    } else if z < CAUTION_FROM {
        0.0
    } else if z < DANGER_FROM {
        -0.3 * (z - CAUTION_FROM)
    } else {
        let d = z - DANGER_FROM;
        -0.5 * d * d - 0.3
    }
}

/// `-z + boost(z)`: positive when the valuation is cheap.
pub fn value_signal(z: f64) -> f64 {
    -z + extreme_boost(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: [f64; 4] = [-2.0, -1.0, 1.5, 2.5];

    #[test]
    fn continuous_at_zone_boundaries() {
        let eps = 1e-9;
        for b in BOUNDARIES {
            let left = extreme_boost(b - eps);
            let right = extreme_boost(b);
            assert!(
                (left - right).abs() < 1e-6,
                "jump at z={b}: left={left}, right={right}"
            );
        }
    }

    #[test]
    fn known_values() {
        assert!((extreme_boost(-3.0) - 1.3).abs() < 1e-12);
        assert!((extreme_boost(-2.0) - 0.5).abs() < 1e-12);
        assert!((extreme_boost(-1.5) - 0.25).abs() < 1e-12);
        assert_eq!(extreme_boost(0.0), 0.0);
        assert!((extreme_boost(2.0) + 0.15).abs() < 1e-12);
        assert!((extreme_boost(3.5) + 0.8).abs() < 1e-12);
    }

    #[test]
    fn sign_by_zone() {
        assert!(extreme_boost(-2.5) > 0.0);
        assert!(extreme_boost(-1.2) > 0.0);
        assert!(extreme_boost(1.6) < 0.0);
        assert!(extreme_boost(3.0) < 0.0);
    }

    #[test]
    fn value_signal_is_monotone_decreasing() {
        let mut prev = value_signal(-4.0);
        let mut z = -4.0;
        while z < 4.0 {
            z += 0.01;
            let v = value_signal(z);
            assert!(v <= prev + 1e-12, "value_signal rose at z={z}");
            prev = v;
        }
    }
}

//! Sequential allocator: per-day multipliers in, a normalized weight vector out.
//!
//! Past days (up to and including the as-of index) draw from a shared budget
//! in date order. Each past weight depends only on the multipliers up to its
//! own day, the window length and the floor, so extending the as-of index
//! never changes an already computed weight. Future days split whatever
//! budget is left evenly, and the last day absorbs the floating-point residual.

use crate::config::NormalizationPolicy;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("cannot allocate over an empty window")]
    Empty,

    #[error("floor {min_weight} is infeasible for {days} days (days x floor > 1)")]
    FloorInfeasible { days: usize, min_weight: f64 },

    #[error("as-of index {index} outside window of {len} days")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Relative emphasis of day `i` given the multipliers of days `0..=i`.
///
/// `prefix_sum` is the sum of the (sanitized) multipliers up to and including `i`.
fn signal_ratio(policy: NormalizationPolicy, multiplier: f64, prefix_sum: f64, i: usize) -> f64 {
    let max = policy.max_ratio();
    let raw = match policy {
        NormalizationPolicy::PrefixMean { .. } => {
            let mean = prefix_sum / (i + 1) as f64;
            if mean > 0.0 {
                multiplier / mean
            } else {
                1.0
            }
        }
        NormalizationPolicy::Absolute { .. } => multiplier,
    };
    if raw.is_finite() {
        raw.clamp(1.0 / max, max)
    } else {
        1.0
    }
}

fn sanitize(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier > 0.0 {
        multiplier
    } else {
        1.0
    }
}

/// Allocate a unit budget over `multipliers.len()` days.
///
/// `current_index` is the last locked day; `None` means the as-of date
/// precedes the window and every day is future.
pub fn allocate(
    multipliers: &[f64],
    current_index: Option<usize>,
    min_weight: f64,
    policy: NormalizationPolicy,
) -> Result<Vec<f64>, AllocationError> {
    let n = multipliers.len();
    if n == 0 {
        return Err(AllocationError::Empty);
    }
    if n as f64 * min_weight > 1.0 {
        return Err(AllocationError::FloorInfeasible {
            days: n,
            min_weight,
        });
    }
    if let Some(index) = current_index {
        if index >= n {
            return Err(AllocationError::IndexOutOfRange { index, len: n });
        }
    }

    let base = 1.0 / n as f64;
    let last = n - 1;
    let locked = current_index.map_or(0, |c| c + 1);
    let mut weights = vec![0.0; n];

    let mut remaining = 1.0;
    let mut prefix_sum = 0.0;
    for (i, &m) in multipliers.iter().enumerate().take(locked) {
        let m = sanitize(m);
        prefix_sum += m;
        let ratio = signal_ratio(policy, m, prefix_sum, i);
        let cap = remaining - min_weight * (n - i - 1) as f64;
        let w = (base * ratio).min(cap).max(min_weight);
        weights[i] = w;
        remaining -= w;
    }

    let future_days = n - locked;
    if future_days > 0 {
        let share = remaining / future_days as f64;
        for w in &mut weights[locked..] {
            *w = share;
        }
    }

    let head: f64 = weights[..last].iter().sum();
    weights[last] = 1.0 - head;

    enforce_floor(&mut weights, min_weight, locked);
    Ok(weights)
}

/// Raise entries below `min_weight` to the floor and take the shortfall
/// proportionally from unlocked entries above it.
///
/// Locked entries are never reduced. The fold reserves the floor for every
/// later day, so a shortfall the unlocked entries cannot cover is rounding
/// noise and is left as a sum excess.
fn enforce_floor(weights: &mut [f64], min_weight: f64, locked: usize) {
    let mut shortfall = 0.0;
    for w in weights.iter_mut() {
        if *w < min_weight {
            shortfall += min_weight - *w;
            *w = min_weight;
        }
    }
    if shortfall <= 0.0 || locked >= weights.len() {
        return;
    }

    let capacity: f64 = weights[locked..]
        .iter()
        .map(|w| (w - min_weight).max(0.0))
        .sum();
    if capacity <= 0.0 {
        return;
    }
    let take = shortfall.min(capacity);
    for w in &mut weights[locked..] {
        let excess = *w - min_weight;
        if excess > 0.0 {
            *w = (*w - take * excess / capacity).max(min_weight);
        }
    }
}

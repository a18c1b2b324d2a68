//! Window weight service.
//!
//! `WeightModel` owns a validated history, precomputes its feature set once,
//! and answers `compute_window_weights(start, end, current_date)` for any
//! window. Dates after `current_date` see neutral placeholder rows, never
//! their true features: that is the leakage boundary.

use crate::allocation::{allocate, AllocationError};
use crate::config::{ConfigError, ModelConfig, SignalWeights};
use crate::domain::{PriceHistory, WeightVector};
use crate::features::{FeatureBuilder, FeatureRow, FeatureSet, SignalMode};
use crate::signal::{compose_with, SignalBreakdown};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

/// Tolerance on `sum(weights) == 1`.
pub const SUM_TOLERANCE: f64 = 1e-6;
/// Absolute tolerance on equality of the future entries (weights are
/// fractions of a unit budget; the last day carries the summation residual).
pub const FUTURE_TOLERANCE: f64 = 1e-12;

/// A Weight Vector invariant that failed its check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    Sum,
    Floor,
    FutureUniform,
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Invariant::Sum => "sum",
            Invariant::Floor => "floor",
            Invariant::FutureUniform => "future-uniform",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeightError {
    #[error("invalid window [{start}, {end}] with as-of date {current_date}")]
    InvalidWindow {
        start: NaiveDate,
        end: NaiveDate,
        current_date: NaiveDate,
    },

    #[error("floor {min_weight} is infeasible for a {days}-day window")]
    FloorInfeasible { days: usize, min_weight: f64 },

    #[error(
        "{invariant} invariant violated for window [{start}, {end}] as of {current_date}: measured {measured}"
    )]
    InvariantViolation {
        start: NaiveDate,
        end: NaiveDate,
        current_date: NaiveDate,
        invariant: Invariant,
        measured: f64,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Precomputed single-window engine over one history.
#[derive(Debug, Clone)]
pub struct WeightModel {
    history: PriceHistory,
    config: ModelConfig,
    features: FeatureSet,
}

impl WeightModel {
    /// Validate the config and precompute features.
    pub fn new(history: PriceHistory, config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let features = FeatureBuilder::new(config.windows).build(&history);
        Ok(Self {
            history,
            config,
            features,
        })
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Mode of the history as a whole; see `signal_weights_on` for the
    /// weights a given date actually uses.
    pub fn mode(&self) -> SignalMode {
        self.features.mode()
    }

    /// Signal weights for the row dated `date`: the single-signal weights
    /// until a valuation ratio has been observed before `date`.
    pub fn signal_weights_on(&self, date: NaiveDate) -> SignalWeights {
        match self.features.mode_on(date) {
            SignalMode::Full => self.config.weights,
            SignalMode::PriceOnly => SignalWeights::price_only(),
        }
    }

    /// Composition for a single history date.
    pub fn signal_breakdown(&self, date: NaiveDate) -> Option<SignalBreakdown> {
        self.features
            .row_for(date)
            .map(|row| compose_with(row, self.signal_weights_on(date), &self.config))
    }

    /// Feature row seen on `date` when evaluating as of `current_date`.
    fn row_as_of(&self, date: NaiveDate, current_date: NaiveDate) -> FeatureRow {
        if date > current_date {
            return FeatureRow::neutral();
        }
        self.features
            .row_for(date)
            .copied()
            .unwrap_or_else(FeatureRow::neutral)
    }

    /// Raw per-day multipliers for the window.
    pub fn multipliers(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        current_date: NaiveDate,
    ) -> Result<Vec<f64>, WeightError> {
        check_bounds(start, end, current_date)?;
        Ok(calendar(start, end)
            .map(|date| {
                let row = self.row_as_of(date, current_date);
                // Placeholder rows take the mode known on the as-of date.
                let weights = self.signal_weights_on(date.min(current_date));
                compose_with(&row, weights, &self.config).multiplier
            })
            .collect())
    }

    /// Weight vector for `[start, end]` as of `current_date`.
    pub fn compute_window_weights(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        current_date: NaiveDate,
    ) -> Result<WeightVector, WeightError> {
        let multipliers = self.multipliers(start, end, current_date)?;
        let current_index = if current_date < start {
            None
        } else {
            Some((current_date - start).num_days() as usize)
        };

        let weights = allocate(
            &multipliers,
            current_index,
            self.config.min_weight,
            self.config.normalization,
        )
        .map_err(|e| match e {
            AllocationError::FloorInfeasible { days, min_weight } => {
                WeightError::FloorInfeasible { days, min_weight }
            }
            AllocationError::Empty | AllocationError::IndexOutOfRange { .. } => {
                WeightError::InvalidWindow {
                    start,
                    end,
                    current_date,
                }
            }
        })?;

        let vector = WeightVector {
            dates: calendar(start, end).collect(),
            weights,
            current_index,
        };
        check_invariants(&vector, self.config.min_weight).map_err(|(invariant, measured)| {
            WeightError::InvariantViolation {
                start,
                end,
                current_date,
                invariant,
                measured,
            }
        })?;

        debug!(
            %start,
            %end,
            %current_date,
            days = vector.len(),
            locked = vector.locked().len(),
            "computed window weights"
        );
        Ok(vector)
    }
}

fn check_bounds(start: NaiveDate, end: NaiveDate, current_date: NaiveDate) -> Result<(), WeightError> {
    if start > end || current_date > end {
        return Err(WeightError::InvalidWindow {
            start,
            end,
            current_date,
        });
    }
    Ok(())
}

/// Every calendar day in `[start, end]`.
fn calendar(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Check sum, floor and future-uniformity; on failure return the invariant and
/// its measured value.
pub fn check_invariants(vector: &WeightVector, min_weight: f64) -> Result<(), (Invariant, f64)> {
    let sum = vector.sum();
    if !sum.is_finite() || (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err((Invariant::Sum, sum));
    }

    let min = vector.min();
    if min < min_weight {
        return Err((Invariant::Floor, min));
    }

    let future = vector.future();
    if let Some(&first) = future.first() {
        let spread = future
            .iter()
            .map(|w| (w - first).abs())
            .fold(0.0, f64::max);
        if spread > FUTURE_TOLERANCE {
            return Err((Invariant::FutureUniform, spread));
        }
    }
    Ok(())
}

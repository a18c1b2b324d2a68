//! Weight vector: the engine's output for one window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One non-negative weight per calendar day of a window.
///
/// Entries at positions `0..=current_index` are locked: recomputing the same
/// window with a later as-of date reproduces them bit for bit. Entries after
/// `current_index` share the remaining budget uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub dates: Vec<NaiveDate>,
    pub weights: Vec<f64>,
    /// Index of the as-of date inside the window. `None` when the as-of date
    /// precedes the window start (nothing locked yet).
    pub current_index: Option<usize>,
}

impl WeightVector {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn min(&self) -> f64 {
        self.weights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.current_index.is_some_and(|c| index <= c)
    }

    /// Locked (past) weights.
    pub fn locked(&self) -> &[f64] {
        match self.current_index {
            Some(c) => &self.weights[..=c],
            None => &[],
        }
    }

    /// Weights after the as-of date.
    pub fn future(&self) -> &[f64] {
        match self.current_index {
            Some(c) => &self.weights[c + 1..],
            None => &self.weights,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.weights.iter().copied())
    }
}

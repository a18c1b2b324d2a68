//! Feature builder and the precomputed feature set.
//!
//! Raw features are computed causally over the full history, shifted forward
//! one row, and only then filled with neutral defaults. The feature row for
//! date t therefore reflects information available through t-1, and the fill
//! itself reveals nothing about data availability at t.

pub mod builder;
pub mod confidence;
pub mod zone;

pub use builder::FeatureBuilder;
pub use confidence::signal_confidence;
pub use zone::ValuationZone;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Neutral value for signed features.
pub const NEUTRAL_SIGNED: f64 = 0.0;
/// Neutral value for percentile-like features.
pub const NEUTRAL_PERCENTILE: f64 = 0.5;

/// Whether the valuation signal is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// A valuation ratio has been observed: all three signals.
    Full,
    /// No valuation ratio observed (yet): price-only signal.
    PriceOnly,
}

/// Lagged, filled features for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub price_vs_ma: f64,
    pub valuation_zscore: f64,
    pub valuation_gradient: f64,
    pub valuation_percentile: f64,
    pub valuation_acceleration: f64,
    pub valuation_zone: ValuationZone,
    pub valuation_volatility: f64,
    pub signal_confidence: f64,
}

impl FeatureRow {
    /// Placeholder row for dates whose features are unknown (future or missing).
    pub fn neutral() -> Self {
        Self::from_lagged(
            NEUTRAL_SIGNED,
            NEUTRAL_SIGNED,
            NEUTRAL_SIGNED,
            NEUTRAL_PERCENTILE,
            NEUTRAL_SIGNED,
            NEUTRAL_PERCENTILE,
        )
    }

    /// Assemble a row from already lagged and filled inputs, deriving zone and confidence.
    pub fn from_lagged(
        price_vs_ma: f64,
        valuation_zscore: f64,
        valuation_gradient: f64,
        valuation_percentile: f64,
        valuation_acceleration: f64,
        valuation_volatility: f64,
    ) -> Self {
        Self {
            price_vs_ma,
            valuation_zscore,
            valuation_gradient,
            valuation_percentile,
            valuation_acceleration,
            valuation_zone: ValuationZone::classify(valuation_zscore),
            valuation_volatility,
            signal_confidence: signal_confidence(
                valuation_zscore,
                valuation_percentile,
                price_vs_ma,
                valuation_gradient,
            ),
        }
    }
}

/// Feature rows for every date of the history, computed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    dates: Vec<NaiveDate>,
    rows: Vec<FeatureRow>,
    /// Date of the first record with a finite valuation ratio.
    valuation_since: Option<NaiveDate>,
}

impl FeatureSet {
    pub(crate) fn new(
        dates: Vec<NaiveDate>,
        rows: Vec<FeatureRow>,
        valuation_since: Option<NaiveDate>,
    ) -> Self {
        debug_assert_eq!(dates.len(), rows.len());
        Self {
            dates,
            rows,
            valuation_since,
        }
    }

    /// Mode of the history as a whole: price-only when it never carries a
    /// valuation ratio.
    pub fn mode(&self) -> SignalMode {
        match self.valuation_since {
            Some(_) => SignalMode::Full,
            None => SignalMode::PriceOnly,
        }
    }

    pub fn valuation_since(&self) -> Option<NaiveDate> {
        self.valuation_since
    }

    /// Mode in effect for the row dated `date`. Like every feature it only
    /// sees earlier records: full once a valuation ratio exists strictly
    /// before `date`.
    pub fn mode_on(&self, date: NaiveDate) -> SignalMode {
        match self.valuation_since {
            Some(first) if first < date => SignalMode::Full,
            _ => SignalMode::PriceOnly,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Row for `date`, if the history has a record on that date.
    pub fn row_for(&self, date: NaiveDate) -> Option<&FeatureRow> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| &self.rows[i])
    }
}

//! Backtest driver: every fixed-length window across the history.
//!
//! Features are computed once by the `WeightModel` and shared read-only; each
//! window is a pure function of (model, start), so windows may be evaluated
//! on the rayon pool. Results are collected in window order, so serial and
//! parallel runs aggregate identically.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stacklab_core::features::SignalMode;
use stacklab_core::window::{WeightError, WeightModel};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{config_fingerprint, BacktestConfig, RunConfigError};
use crate::metrics::{MetricsSummary, WindowSpd};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the backtest driver.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("history of {records} records is shorter than one {window_days}-day window")]
    HistoryTooShort { records: usize, window_days: usize },

    #[error("no complete window starts between {from} and {until} ({skipped} skipped for gaps)")]
    NoWindows {
        from: NaiveDate,
        until: NaiveDate,
        skipped: usize,
    },

    #[error("every one of {failed} windows failed; first: {first}")]
    AllWindowsFailed { failed: usize, first: WeightError },

    #[error("invalid backtest config: {0}")]
    Config(#[from] RunConfigError),
}

/// Outcome of one evaluated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub spd: WindowSpd,
}

/// A window whose weight vector was rejected. Reported, never averaged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFailure {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub error: String,
}

/// Complete result of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub summary: MetricsSummary,
    pub windows: Vec<WindowResult>,
    pub failures: Vec<WindowFailure>,
    /// Candidate starts without full daily coverage.
    pub skipped_windows: usize,
    pub window_days: usize,
    pub signal_mode: SignalMode,
    /// First date with a valuation ratio; earlier dates ran price-only.
    #[serde(default)]
    pub valuation_since: Option<NaiveDate>,
    pub dataset_hash: String,
    pub config_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestReport {
    /// Mark the report as produced on synthetic data.
    pub fn tagged_synthetic(mut self, synthetic: bool) -> Self {
        self.has_synthetic = synthetic;
        self
    }
}

/// Window starts to evaluate, plus the number of candidates skipped for gaps.
///
/// A candidate is any record date inside the configured start range whose
/// window `[start, start + window_days - 1]` has a record on every day.
pub fn window_starts(
    model: &WeightModel,
    config: &BacktestConfig,
) -> Result<(Vec<NaiveDate>, usize), BacktestError> {
    config.validate()?;
    let records = model.history().records();
    let w = config.window_days;
    if records.len() < w {
        return Err(BacktestError::HistoryTooShort {
            records: records.len(),
            window_days: w,
        });
    }

    let span = Duration::days(w as i64 - 1);
    let from = config.start_from.unwrap_or(records[0].date);
    let until = config
        .start_until
        .unwrap_or(records[records.len() - 1].date - span);

    let mut starts = Vec::new();
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let start = record.date;
        if start < from || start > until || start + span > records[records.len() - 1].date {
            continue;
        }
        // Dates are strictly increasing, so full coverage means the record
        // w-1 rows later falls exactly w-1 days later.
        match records.get(i + w - 1) {
            Some(last) if last.date == start + span => starts.push(start),
            _ => skipped += 1,
        }
    }

    if starts.is_empty() {
        return Err(BacktestError::NoWindows {
            from,
            until,
            skipped,
        });
    }
    if skipped > 0 {
        warn!(skipped, "skipped windows with missing days");
    }
    Ok((starts, skipped))
}

/// Evaluate one window as of its last day.
pub fn evaluate_window(
    model: &WeightModel,
    start: NaiveDate,
    window_days: usize,
) -> Result<WindowResult, WeightError> {
    let end = start + Duration::days(window_days as i64 - 1);
    let weights = model.compute_window_weights(start, end, end)?;

    let history = model.history();
    let first = history.index_of(start).ok_or(WeightError::InvalidWindow {
        start,
        end,
        current_date: end,
    })?;
    let prices: Vec<f64> = history.records()[first..first + window_days]
        .iter()
        .map(|r| r.price)
        .collect();

    Ok(WindowResult {
        start,
        end,
        spd: WindowSpd::compute(&prices, &weights.weights),
    })
}

/// Run the backtest over every complete window.
pub fn run_backtest(
    model: &WeightModel,
    config: &BacktestConfig,
) -> Result<BacktestReport, BacktestError> {
    let (starts, skipped_windows) = window_starts(model, config)?;
    let w = config.window_days;
    info!(
        windows = starts.len(),
        window_days = w,
        parallel = config.parallel,
        mode = ?model.mode(),
        "starting backtest"
    );

    let outcomes: Vec<(NaiveDate, Result<WindowResult, WeightError>)> = if config.parallel {
        starts
            .par_iter()
            .map(|&s| (s, evaluate_window(model, s, w)))
            .collect()
    } else {
        starts
            .iter()
            .map(|&s| (s, evaluate_window(model, s, w)))
            .collect()
    };

    let mut windows = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    let mut first_error = None;
    for (start, outcome) in outcomes {
        match outcome {
            Ok(result) => windows.push(result),
            Err(e) => {
                warn!(%start, error = %e, "window failed validation");
                failures.push(WindowFailure {
                    start,
                    end: start + Duration::days(w as i64 - 1),
                    error: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }
    if windows.is_empty() {
        if let Some(first) = first_error {
            return Err(BacktestError::AllWindowsFailed {
                failed: failures.len(),
                first,
            });
        }
    }

    let spd: Vec<WindowSpd> = windows.iter().map(|r| r.spd).collect();
    let summary = MetricsSummary::compute(&spd, config.recency_decay);
    info!(
        windows = summary.window_count,
        failed = failures.len(),
        win_rate = summary.win_rate,
        model_score = summary.model_score,
        "backtest complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        summary,
        windows,
        failures,
        skipped_windows,
        window_days: w,
        signal_mode: model.mode(),
        valuation_since: model.features().valuation_since(),
        dataset_hash: model.history().fingerprint(),
        config_hash: config_fingerprint(model.config(), config),
        has_synthetic: false,
    })
}

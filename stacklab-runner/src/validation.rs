//! Validation protocols run against a fitted `WeightModel`.
//!
//! Four checks, each reported independently:
//! 1. `weight_invariants`: sum, floor and future uniformity over sampled windows
//! 2. `locking`: progressive as-of dates never alter already-locked weights
//! 3. `leakage`: masking everything after a cutoff date changes nothing
//! 4. `win_rate`: backtest win rate meets the configured minimum
//!
//! All sampling is driven by a seeded `StdRng` and drawn up front, so serial
//! and parallel runs check identical cases.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stacklab_core::features::SignalMode;
use stacklab_core::window::{check_invariants, WeightModel};
use tracing::{info, warn};

use crate::backtest::{run_backtest, BacktestError, BacktestReport, SCHEMA_VERSION};
use crate::config::RunConfig;

/// Failure descriptions kept per check.
pub const MAX_REPORTED_FAILURES: usize = 10;

/// Outcome of one validation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    /// Cases evaluated.
    pub cases: usize,
    /// Cases that failed (may exceed `failures.len()`).
    pub failed_cases: usize,
    /// Up to `MAX_REPORTED_FAILURES` descriptions.
    pub failures: Vec<String>,
}

impl ValidationCheck {
    fn from_outcomes(name: &str, outcomes: Vec<Result<(), String>>) -> Self {
        let cases = outcomes.len();
        let errors: Vec<String> = outcomes.into_iter().filter_map(Result::err).collect();
        let failed_cases = errors.len();
        Self {
            name: name.to_string(),
            passed: failed_cases == 0 && cases > 0,
            cases,
            failed_cases,
            failures: errors.into_iter().take(MAX_REPORTED_FAILURES).collect(),
        }
    }
}

/// All check results for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub checks: Vec<ValidationCheck>,
    pub signal_mode: SignalMode,
    pub dataset_hash: String,
    pub config_hash: String,
    /// Seed every sampled case was drawn from.
    #[serde(default)]
    pub seed: u64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Run every check. The backtest needed for the win-rate check is returned
/// alongside so callers can export it without running it twice.
pub fn run_validation(
    model: &WeightModel,
    config: &RunConfig,
) -> Result<(ValidationReport, BacktestReport), BacktestError> {
    let v = &config.validation;
    let window_days = config.backtest.window_days;
    let parallel = config.backtest.parallel;
    let mut rng = StdRng::seed_from_u64(v.seed);

    info!(
        sample_windows = v.sample_windows,
        locking_windows = v.locking_windows,
        leakage_cutoffs = v.leakage_cutoffs,
        seed = v.seed,
        "running validation"
    );

    let invariants = check_weight_invariants(model, window_days, v.sample_windows, &mut rng, parallel);
    let locking = check_locking(model, window_days, v.locking_windows, &mut rng, parallel);
    let leakage = check_leakage(model, window_days, v.leakage_cutoffs);
    let backtest = run_backtest(model, &config.backtest)?;
    let win_rate = check_win_rate(&backtest, v.min_win_rate);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION,
        checks: vec![invariants, locking, leakage, win_rate],
        signal_mode: model.mode(),
        dataset_hash: model.history().fingerprint(),
        config_hash: config.fingerprint(),
        seed: v.seed,
    };
    for check in report.checks.iter().filter(|c| !c.passed) {
        warn!(
            check = %check.name,
            failed = check.failed_cases,
            cases = check.cases,
            "validation check failed"
        );
    }
    info!(passed = report.all_passed(), "validation complete");
    Ok((report, backtest))
}

fn evaluate<T, F>(cases: &[T], parallel: bool, f: F) -> Vec<Result<(), String>>
where
    T: Sync,
    F: Fn(&T) -> Result<(), String> + Sync,
{
    if parallel {
        cases.par_iter().map(&f).collect()
    } else {
        cases.iter().map(&f).collect()
    }
}

/// Sum, floor and future uniformity on randomly placed windows with random
/// as-of dates, including as-of dates before the window opens.
pub fn check_weight_invariants(
    model: &WeightModel,
    window_days: usize,
    samples: usize,
    rng: &mut StdRng,
    parallel: bool,
) -> ValidationCheck {
    let records = model.history().records();
    let w = window_days as i64;
    let cases: Vec<(NaiveDate, NaiveDate)> = (0..samples)
        .map(|_| {
            let start = records[rng.gen_range(0..records.len())].date;
            let offset = rng.gen_range(-(w / 4)..w);
            (start, start + Duration::days(offset))
        })
        .collect();

    let min_weight = model.config().min_weight;
    let outcomes = evaluate(&cases, parallel, |&(start, as_of)| {
        let end = start + Duration::days(w - 1);
        let vector = model
            .compute_window_weights(start, end, as_of)
            .map_err(|e| e.to_string())?;
        if vector.len() != window_days {
            return Err(format!(
                "window [{start}, {end}] as of {as_of}: {} weights for {window_days} days",
                vector.len()
            ));
        }
        check_invariants(&vector, min_weight).map_err(|(invariant, measured)| {
            format!("window [{start}, {end}] as of {as_of}: {invariant} measured {measured}")
        })
    });
    ValidationCheck::from_outcomes("weight_invariants", outcomes)
}

/// Walk each sampled window's as-of date from start to end; every weight
/// locked at one step must be bit-identical at every later step.
pub fn check_locking(
    model: &WeightModel,
    window_days: usize,
    windows: usize,
    rng: &mut StdRng,
    parallel: bool,
) -> ValidationCheck {
    let records = model.history().records();
    let w = window_days as i64;
    let starts: Vec<NaiveDate> = (0..windows)
        .map(|_| records[rng.gen_range(0..records.len())].date)
        .collect();

    let outcomes = evaluate(&starts, parallel, |&start| {
        let end = start + Duration::days(w - 1);
        let mut previous = model
            .compute_window_weights(start, end, start)
            .map_err(|e| e.to_string())?;
        for step in 1..w {
            let as_of = start + Duration::days(step);
            let next = model
                .compute_window_weights(start, end, as_of)
                .map_err(|e| e.to_string())?;
            for (i, (a, b)) in previous.locked().iter().zip(next.weights.iter()).enumerate() {
                if a.to_bits() != b.to_bits() {
                    return Err(format!(
                        "window [{start}, {end}]: weight on {} moved from {a} to {b} at as-of {as_of}",
                        previous.dates[i]
                    ));
                }
            }
            previous = next;
        }
        Ok(())
    });
    ValidationCheck::from_outcomes("locking", outcomes)
}

/// Cutoff dates spread evenly across the history. For each cutoff a model is
/// rebuilt from the records up to the cutoff only, signal mode included;
/// windows ending at, around and after the cutoff must get the same weights
/// as from the full model.
pub fn check_leakage(model: &WeightModel, window_days: usize, cutoffs: usize) -> ValidationCheck {
    let history = model.history();
    let n = history.len();
    let w = window_days as i64;
    let cutoff_dates: Vec<NaiveDate> = (1..=cutoffs)
        .map(|k| history.records()[(k * (n - 1)) / cutoffs.max(1)].date)
        .collect();

    let mut outcomes = Vec::with_capacity(cutoff_dates.len() * 3);
    for cutoff in cutoff_dates {
        let masked = match history
            .truncate_after(cutoff)
            .map(|h| WeightModel::new(h, model.config().clone()))
        {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                outcomes.push(Err(format!("cutoff {cutoff}: {e}")));
                continue;
            }
            None => {
                outcomes.push(Err(format!("cutoff {cutoff}: nothing left after masking")));
                continue;
            }
        };

        for offset in [0, w / 2, w - 1] {
            let start = cutoff - Duration::days(offset);
            let end = start + Duration::days(w - 1);
            let outcome = match (
                model.compute_window_weights(start, end, cutoff),
                masked.compute_window_weights(start, end, cutoff),
            ) {
                (Ok(a), Ok(b)) => match a
                    .weights
                    .iter()
                    .zip(&b.weights)
                    .position(|(x, y)| x.to_bits() != y.to_bits())
                {
                    None => Ok(()),
                    Some(i) => Err(format!(
                        "cutoff {cutoff}, window [{start}, {end}]: weight on {} is {} with full history, {} when masked",
                        a.dates[i], a.weights[i], b.weights[i]
                    )),
                },
                (Err(e), _) | (_, Err(e)) => Err(format!("cutoff {cutoff}: {e}")),
            };
            outcomes.push(outcome);
        }
    }
    ValidationCheck::from_outcomes("leakage", outcomes)
}

/// Backtest win rate against the configured minimum; one case per window.
pub fn check_win_rate(report: &BacktestReport, min_win_rate: f64) -> ValidationCheck {
    let summary = &report.summary;
    let passed = summary.window_count > 0 && summary.win_rate >= min_win_rate;
    let failures = if passed {
        Vec::new()
    } else {
        vec![format!(
            "win rate {:.4} ({} of {} windows) below minimum {min_win_rate}",
            summary.win_rate, summary.win_count, summary.window_count
        )]
    };
    ValidationCheck {
        name: "win_rate".to_string(),
        passed,
        cases: summary.window_count,
        failed_cases: if passed { 0 } else { summary.loss_count },
        failures,
    }
}

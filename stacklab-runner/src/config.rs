//! Serializable run configuration: model, backtest and validation settings.
//!
//! Loaded from TOML and validated immediately, before any computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stacklab_core::config::{ConfigError, ModelConfig};
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("model config: {0}")]
    Model(#[from] ConfigError),

    #[error("parameter '{name}' out of range: {value} (expected {expected})")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Backtest window enumeration and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BacktestConfig {
    /// Calendar days per window.
    pub window_days: usize,
    /// Earliest window start (inclusive). Defaults to the first record.
    pub start_from: Option<NaiveDate>,
    /// Latest window start (inclusive). Defaults to the last feasible start.
    pub start_until: Option<NaiveDate>,
    /// Per-window recency decay for the exponentially weighted percentile.
    pub recency_decay: f64,
    /// Evaluate windows on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window_days: 365,
            start_from: None,
            start_until: None,
            recency_decay: 0.999,
            parallel: true,
        }
    }
}

impl BacktestConfig {
    /// Range checks on the window settings alone.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.window_days < 2 {
            return Err(RunConfigError::OutOfRange {
                name: "backtest.window_days",
                value: self.window_days.to_string(),
                expected: ">= 2",
            });
        }
        if !(self.recency_decay > 0.0 && self.recency_decay <= 1.0) {
            return Err(RunConfigError::OutOfRange {
                name: "backtest.recency_decay",
                value: self.recency_decay.to_string(),
                expected: "in (0, 1]",
            });
        }
        if let (Some(from), Some(until)) = (self.start_from, self.start_until) {
            if from > until {
                return Err(RunConfigError::OutOfRange {
                    name: "backtest.start_until",
                    value: until.to_string(),
                    expected: "on or after start_from",
                });
            }
        }
        Ok(())
    }
}

/// BLAKE3 fingerprint of everything that shapes the weights and the windows:
/// the model config and the backtest settings.
pub fn config_fingerprint(model: &ModelConfig, backtest: &BacktestConfig) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.fingerprint().as_bytes());
    hasher.update(serde_json::to_string(backtest).unwrap_or_default().as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Validation protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Windows sampled for the sum/floor/future-uniformity check.
    pub sample_windows: usize,
    /// Windows re-evaluated with progressive as-of dates for the locking check.
    pub locking_windows: usize,
    /// Cutoff dates for the leakage check.
    pub leakage_cutoffs: usize,
    /// Seed for all sampling.
    pub seed: u64,
    /// Minimum acceptable backtest win rate.
    pub min_win_rate: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            sample_windows: 2000,
            locking_windows: 50,
            leakage_cutoffs: 12,
            seed: 42,
            min_win_rate: 0.5,
        }
    }
}

/// Complete configuration for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub backtest: BacktestConfig,
    pub validation: ValidationConfig,
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RunConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.model.validate()?;
        self.backtest.validate()?;

        if self.backtest.window_days as f64 * self.model.min_weight > 1.0 {
            return Err(RunConfigError::OutOfRange {
                name: "model.min_weight",
                value: self.model.min_weight.to_string(),
                expected: "<= 1 / window_days",
            });
        }

        let v = &self.validation;
        for (name, count) in [
            ("validation.sample_windows", v.sample_windows),
            ("validation.locking_windows", v.locking_windows),
            ("validation.leakage_cutoffs", v.leakage_cutoffs),
        ] {
            if count == 0 {
                return Err(RunConfigError::OutOfRange {
                    name,
                    value: count.to_string(),
                    expected: ">= 1",
                });
            }
        }
        if !(0.0..=1.0).contains(&v.min_win_rate) {
            return Err(RunConfigError::OutOfRange {
                name: "validation.min_win_rate",
                value: v.min_win_rate.to_string(),
                expected: "in [0, 1]",
            });
        }
        Ok(())
    }

    /// Same fingerprint the backtest report carries. Validation sampling
    /// settings are reported separately and are not part of it.
    pub fn fingerprint(&self) -> String {
        config_fingerprint(&self.model, &self.backtest)
    }
}

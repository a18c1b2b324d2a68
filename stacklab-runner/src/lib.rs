//! StackLab Runner: many-window orchestration on top of `stacklab-core`.
//!
//! This crate builds on the single-window engine to provide:
//! - Run configuration loading (TOML) and validation
//! - CSV data loading with a seeded synthetic fallback for development
//! - The backtest driver over every complete window of a history
//! - Sats-per-dollar metrics and the aggregated summary
//! - Validation protocols (weight invariants, locking, leakage, win rate)
//! - JSON, CSV and Markdown export

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod validation;

pub use backtest::{
    run_backtest, BacktestError, BacktestReport, WindowFailure, WindowResult, SCHEMA_VERSION,
};
pub use config::{BacktestConfig, RunConfig, RunConfigError, ValidationConfig};
pub use data_loader::{
    generate_synthetic_history, load_csv, CsvColumns, DataSource, LoadError, LoadedHistory,
};
pub use metrics::{MetricsSummary, SpdStats, WindowSpd};
pub use validation::{run_validation, ValidationCheck, ValidationReport};

//! StackLab Core: the single-window engine of a dynamic DCA weighting model.
//!
//! This crate contains everything needed to turn a daily price history into a
//! weight schedule for one accumulation window:
//! - Daily records, price history and the weight vector
//! - Windowed reductions (rolling mean/std/rank, EWM)
//! - Feature builder with the one-day lag and neutral fill
//! - Signal composer (extreme boost, trend/acceleration/confidence/volatility modifiers)
//! - Sequential allocator with past locking and a uniform future split
//! - Window weight service with invariant checks

pub mod allocation;
pub mod config;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod signal;
pub mod window;

pub use config::{ConfigError, ModelConfig, NormalizationPolicy, SignalWeights};
pub use domain::{DailyRecord, HistoryError, PriceHistory, WeightVector};
pub use features::{FeatureRow, FeatureSet, SignalMode};
pub use window::{WeightError, WeightModel};

//! Domain types: daily records, validated history, weight vectors.

pub mod record;
pub mod weights;

pub use record::{DailyRecord, HistoryError, PriceHistory};
pub use weights::WeightVector;

//! Daily record: the fundamental input unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One day of market data: a price plus an optional valuation ratio.
///
/// `extras` carries any auxiliary numeric columns supplied by the loader.
/// They are preserved for downstream consumers but do not feed the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub price: f64,
    #[serde(default)]
    pub valuation_ratio: Option<f64>,
    #[serde(default)]
    pub extras: BTreeMap<String, f64>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price,
            valuation_ratio: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_valuation(mut self, ratio: f64) -> Self {
        self.valuation_ratio = Some(ratio);
        self
    }
}

/// Errors raised while assembling a history.
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("history is empty")]
    Empty,

    #[error("dates must be strictly increasing: {previous} followed by {next}")]
    NotIncreasing { previous: NaiveDate, next: NaiveDate },

    #[error("invalid price {price} on {date} (must be positive and finite)")]
    InvalidPrice { date: NaiveDate, price: f64 },
}

/// Validated, date-ordered series of daily records.
///
/// Loaded once per run and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    records: Vec<DailyRecord>,
}

impl PriceHistory {
    pub fn new(records: Vec<DailyRecord>) -> Result<Self, HistoryError> {
        if records.is_empty() {
            return Err(HistoryError::Empty);
        }
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(HistoryError::NotIncreasing {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        if let Some(bad) = records
            .iter()
            .find(|r| !r.price.is_finite() || r.price <= 0.0)
        {
            return Err(HistoryError::InvalidPrice {
                date: bad.date,
                price: bad.price,
            });
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    pub fn prices(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.price).collect()
    }

    /// Valuation ratios with missing entries as NaN.
    pub fn valuation_ratios(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.valuation_ratio.unwrap_or(f64::NAN))
            .collect()
    }

    /// True if at least one record carries a finite valuation ratio.
    pub fn has_valuation(&self) -> bool {
        self.first_valuation_date().is_some()
    }

    /// Date of the earliest record with a finite valuation ratio.
    pub fn first_valuation_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .find(|r| r.valuation_ratio.is_some_and(f64::is_finite))
            .map(|r| r.date)
    }

    /// Row index of `date`, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.records.binary_search_by_key(&date, |r| r.date).ok()
    }

    /// History masked after `date`: only records with `record.date <= date` remain.
    ///
    /// Returns `None` when nothing survives the mask.
    pub fn truncate_after(&self, date: NaiveDate) -> Option<PriceHistory> {
        let end = self.records.partition_point(|r| r.date <= date);
        if end == 0 {
            return None;
        }
        Some(Self {
            records: self.records[..end].to_vec(),
        })
    }

    /// BLAKE3 digest over dates, prices and valuation ratios.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for r in &self.records {
            hasher.update(r.date.to_string().as_bytes());
            hasher.update(&r.price.to_le_bytes());
            hasher.update(&r.valuation_ratio.unwrap_or(f64::NAN).to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

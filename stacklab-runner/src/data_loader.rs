//! Daily record loading for the runner.
//!
//! Two sources:
//! 1. A Coin Metrics style CSV file (`time`, `PriceUSD`, optional `CapMVRVCur`)
//! 2. A seeded synthetic history for developer runs (`--synthetic`)
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged as such in every exported artifact.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stacklab_core::domain::{DailyRecord, HistoryError, PriceHistory};
use stacklab_core::indicators::ewm_of_series;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("no usable rows (skipped {skipped})")]
    NoRows { skipped: usize },

    #[error("invalid history: {0}")]
    History(#[from] HistoryError),
}

/// Column names of the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumns {
    pub date: String,
    pub price: String,
    pub valuation: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            date: "time".into(),
            price: "PriceUSD".into(),
            valuation: "CapMVRVCur".into(),
        }
    }
}

/// Where a loaded history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

/// Result of loading a history, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub history: PriceHistory,
    pub source: DataSource,
    /// BLAKE3 digest over the loaded records.
    pub dataset_hash: String,
    /// Rows dropped for a missing or invalid date or price.
    pub skipped_rows: usize,
    /// Whether the valuation column was present in the header.
    pub has_valuation_column: bool,
}

impl LoadedHistory {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }

    fn new(history: PriceHistory, source: DataSource, skipped_rows: usize, has_valuation_column: bool) -> Self {
        Self {
            dataset_hash: history.fingerprint(),
            history,
            source,
            skipped_rows,
            has_valuation_column,
        }
    }
}

/// Load a daily history from a CSV file.
pub fn load_csv(path: &Path, columns: &CsvColumns) -> Result<LoadedHistory, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = read_csv(file, columns)?;
    info!(
        path = %path.display(),
        records = loaded.history.len(),
        skipped = loaded.skipped_rows,
        first = %loaded.history.first_date(),
        last = %loaded.history.last_date(),
        "loaded daily history"
    );
    Ok(loaded)
}

/// Parse a daily history from any CSV reader.
///
/// Rows with an unparseable date or a missing, non-finite or non-positive
/// price are skipped. Rows are sorted by date; for duplicate dates the last
/// row wins. Every other numeric column is kept in `extras`.
pub fn read_csv<R: std::io::Read>(reader: R, columns: &CsvColumns) -> Result<LoadedHistory, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let date_idx = position(&columns.date).ok_or_else(|| LoadError::MissingColumn(columns.date.clone()))?;
    let price_idx =
        position(&columns.price).ok_or_else(|| LoadError::MissingColumn(columns.price.clone()))?;
    let valuation_idx = position(&columns.valuation);
    if valuation_idx.is_none() {
        warn!(
            column = %columns.valuation,
            "valuation column absent; the model will run on price alone"
        );
    }

    let mut by_date: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rdr.records() {
        let row = row?;
        let date = row.get(date_idx).and_then(parse_date);
        let price = row.get(price_idx).and_then(parse_number);
        let (date, price) = match (date, price) {
            (Some(d), Some(p)) if p.is_finite() && p > 0.0 => (d, p),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let mut record = DailyRecord::new(date, price);
        record.valuation_ratio = valuation_idx
            .and_then(|i| row.get(i))
            .and_then(parse_number)
            .filter(|v| v.is_finite());
        for (i, name) in headers.iter().enumerate() {
            if i == date_idx || i == price_idx || Some(i) == valuation_idx {
                continue;
            }
            if let Some(v) = row.get(i).and_then(parse_number).filter(|v| v.is_finite()) {
                record.extras.insert(name.trim().to_string(), v);
            }
        }
        if by_date.insert(date, record).is_some() {
            warn!(%date, "duplicate date in input; keeping the later row");
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped rows with a missing or invalid date or price");
    }
    if by_date.is_empty() {
        return Err(LoadError::NoRows { skipped });
    }

    let history = PriceHistory::new(by_date.into_values().collect())?;
    Ok(LoadedHistory::new(
        history,
        DataSource::Csv,
        skipped,
        valuation_idx.is_some(),
    ))
}

/// ISO date, or a timestamp whose first 10 characters are an ISO date.
fn parse_date(field: &str) -> Option<NaiveDate> {
    let field = field.trim();
    let head = field.get(..10).unwrap_or(field);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_number(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// Span of the slow price average standing in for the realized price.
const REALIZED_SPAN: usize = 730;
/// Length of the synthetic market cycle in days.
const CYCLE_DAYS: f64 = 1461.0;

/// Generate a synthetic daily history for testing/development.
///
/// Log-price random walk with drift and a four-year cycle. The valuation ratio
/// is price over a slow exponential average of price, a stand-in for a
/// market-to-realized-value ratio. Fully determined by `seed`.
pub fn generate_synthetic_history(
    start: NaiveDate,
    days: usize,
    seed: u64,
) -> Result<LoadedHistory, LoadError> {
    if days == 0 {
        return Err(LoadError::NoRows { skipped: 0 });
    }
    warn!(days, seed, "generating synthetic data; results will be tagged as synthetic");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut log_price = 1000.0_f64.ln();
    let mut prices = Vec::with_capacity(days);
    for t in 0..days {
        let cycle = 0.004 * (std::f64::consts::TAU * t as f64 / CYCLE_DAYS).cos();
        // Sum of uniforms: cheap bell-shaped noise.
        let noise: f64 = (0..4).map(|_| rng.gen_range(-1.0..1.0)).sum::<f64>() * 0.02;
        log_price += 0.0008 + cycle + noise;
        prices.push(log_price.exp());
    }

    let realized = ewm_of_series(&prices, REALIZED_SPAN);
    let records = prices
        .iter()
        .zip(&realized)
        .enumerate()
        .map(|(i, (&p, &r))| {
            DailyRecord::new(start + chrono::Duration::days(i as i64), p).with_valuation(p / r)
        })
        .collect();

    let history = PriceHistory::new(records)?;
    Ok(LoadedHistory::new(history, DataSource::Synthetic, 0, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
time,PriceUSD,CapMVRVCur,HashRate
2020-01-01T00:00:00.000000000Z,7200.5,1.45,100.0
2020-01-02T00:00:00.000000000Z,6985.0,1.40,
2020-01-03T00:00:00.000000000Z,,1.38,99.0
2020-01-04T00:00:00.000000000Z,7344.9,,101.5
";

    #[test]
    fn parses_coin_metrics_layout() {
        let loaded = read_csv(SAMPLE.as_bytes(), &CsvColumns::default()).unwrap();
        let h = &loaded.history;
        assert_eq!(h.len(), 3);
        assert_eq!(loaded.skipped_rows, 1);
        assert!(loaded.has_valuation_column);
        assert_eq!(h.first_date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(h.records()[0].valuation_ratio, Some(1.45));
        assert_eq!(h.records()[2].valuation_ratio, None);
        assert_eq!(h.records()[0].extras.get("HashRate"), Some(&100.0));
        assert!(h.records()[1].extras.is_empty());
    }

    #[test]
    fn missing_valuation_column_is_not_an_error() {
        let csv = "time,PriceUSD\n2021-05-01,50000\n2021-05-02,51000\n";
        let loaded = read_csv(csv.as_bytes(), &CsvColumns::default()).unwrap();
        assert!(!loaded.has_valuation_column);
        assert!(!loaded.history.has_valuation());
    }

    #[test]
    fn missing_price_column_fails() {
        let csv = "time,Close\n2021-05-01,50000\n";
        let err = read_csv(csv.as_bytes(), &CsvColumns::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "PriceUSD"));
    }

    #[test]
    fn unsorted_rows_are_ordered_and_deduplicated() {
        let csv = "time,PriceUSD\n2021-05-03,3\n2021-05-01,1\n2021-05-03,4\n2021-05-02,2\n";
        let loaded = read_csv(csv.as_bytes(), &CsvColumns::default()).unwrap();
        assert_eq!(loaded.history.prices(), vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn all_rows_invalid_fails() {
        let csv = "time,PriceUSD\nnot-a-date,1\n2021-05-01,-5\n";
        let err = read_csv(csv.as_bytes(), &CsvColumns::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoRows { skipped: 2 }));
    }

    #[test]
    fn custom_column_names() {
        let csv = "date,close,mvrv\n2021-05-01,10,2.0\n";
        let columns = CsvColumns {
            date: "date".into(),
            price: "close".into(),
            valuation: "mvrv".into(),
        };
        let loaded = read_csv(csv.as_bytes(), &columns).unwrap();
        assert_eq!(loaded.history.records()[0].valuation_ratio, Some(2.0));
    }

    #[test]
    fn synthetic_is_deterministic_and_tagged() {
        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let a = generate_synthetic_history(start, 1000, 42).unwrap();
        let b = generate_synthetic_history(start, 1000, 42).unwrap();
        let c = generate_synthetic_history(start, 1000, 43).unwrap();
        assert!(a.is_synthetic());
        assert_eq!(a.history.len(), 1000);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
        assert!(a.history.has_valuation());
        assert!(a.history.prices().iter().all(|p| p.is_finite() && *p > 0.0));
    }
}

//! Integration tests for the runner's data pipeline: CSV on disk through the
//! loader, the model, the backtest and the artifact bundle.

use chrono::{Duration, NaiveDate};
use stacklab_core::window::WeightModel;
use stacklab_runner::backtest::run_backtest;
use stacklab_runner::config::RunConfig;
use stacklab_runner::data_loader::{load_csv, CsvColumns, DataSource, LoadError};
use stacklab_runner::export::{export_weights_csv, load_artifacts, save_artifacts};
use std::fmt::Write as _;
use std::path::Path;

const CONFIG: &str = r#"
[model.windows]
ma_window = 40
ma_min_periods = 20
zscore_window = 90
zscore_min_periods = 20
percentile_window = 300
percentile_min_periods = 60
gradient_window = 10
acceleration_window = 5
volatility_window = 20
volatility_min_periods = 10

[backtest]
window_days = 90
"#;

/// Coin Metrics style file with a gap-free daily series and one bad row.
fn write_csv(dir: &Path, days: i64) -> std::path::PathBuf {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let mut body = String::from("time,PriceUSD,CapMVRVCur,AdrActCnt\n");
    for i in 0..days {
        let t = i as f64;
        let price = 8_000.0 * (1.0 + 0.3 * (t / 60.0).sin()) * (1.0 + t / 1000.0);
        let mvrv = 1.2 + 0.8 * (t / 90.0).sin();
        let date = start + Duration::days(i);
        writeln!(body, "{date}T00:00:00.000000000Z,{price},{mvrv},{}", 500_000 + i).unwrap();
    }
    body.push_str("not-a-date,1.0,1.0,1\n");

    let path = dir.join("btc.csv");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn csv_to_backtest_to_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_csv(dir.path(), 500);
    let config_path = dir.path().join("stacklab.toml");
    std::fs::write(&config_path, CONFIG).unwrap();

    let config = RunConfig::from_toml_file(&config_path).unwrap();
    let loaded = load_csv(&csv_path, &CsvColumns::default()).unwrap();
    assert_eq!(loaded.source, DataSource::Csv);
    assert_eq!(loaded.history.len(), 500);
    assert_eq!(loaded.skipped_rows, 1);
    assert!(loaded.history.records()[0].extras.contains_key("AdrActCnt"));

    let model = WeightModel::new(loaded.history.clone(), config.model.clone()).unwrap();
    let report = run_backtest(&model, &config.backtest)
        .unwrap()
        .tagged_synthetic(loaded.is_synthetic());
    assert_eq!(report.summary.window_count, 500 - 90 + 1);
    assert_eq!(report.dataset_hash, loaded.dataset_hash);
    assert!(!report.has_synthetic);

    let out = dir.path().join("out");
    let run_dir = save_artifacts(&report, &out).unwrap();
    assert!(run_dir.join("summary.json").exists());
    assert!(run_dir.join("report.md").exists());
    let windows_csv = std::fs::read_to_string(run_dir.join("windows.csv")).unwrap();
    assert_eq!(windows_csv.lines().count(), report.windows.len() + 1);

    let restored = load_artifacts(&run_dir).unwrap();
    assert_eq!(restored.windows, report.windows);
    assert_eq!(restored.config_hash, report.config_hash);
}

#[test]
fn loading_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_csv(dir.path(), 120);
    let a = load_csv(&csv_path, &CsvColumns::default()).unwrap();
    let b = load_csv(&csv_path, &CsvColumns::default()).unwrap();
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.history, b.history);
}

#[test]
fn missing_file_reports_path() {
    let err = load_csv(Path::new("/nonexistent/btc.csv"), &CsvColumns::default()).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/btc.csv"));
}

#[test]
fn weights_for_one_window_export_with_lock_flags() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_csv(dir.path(), 400);
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let loaded = load_csv(&csv_path, &CsvColumns::default()).unwrap();
    let model = WeightModel::new(loaded.history, config.model).unwrap();

    let start = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
    let end = start + Duration::days(89);
    let as_of = start + Duration::days(29);
    let vector = model.compute_window_weights(start, end, as_of).unwrap();

    let csv = export_weights_csv(&vector).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 91);
    assert!(lines[30].ends_with(",true"));
    assert!(lines[31].ends_with(",false"));
}

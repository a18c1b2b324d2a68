//! Reporting and export: JSON, CSV and Markdown artifacts.
//!
//! - **JSON**: full round-trip serialization of backtest and validation
//!   reports with schema versioning
//! - **CSV**: per-window results and single weight vectors
//! - **Markdown**: a human-readable summary of one backtest
//!
//! Persisted reports carry a `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stacklab_core::domain::WeightVector;

use crate::backtest::{BacktestReport, WindowResult, SCHEMA_VERSION};
use crate::validation::ValidationReport;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_validation_json(report: &ValidationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ValidationReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per evaluated window.
///
/// Columns: start, end, uniform_spd, dynamic_spd, min_spd, max_spd,
/// uniform_percentile, dynamic_percentile, excess_percentile,
/// relative_improvement_pct, ratio, win
pub fn export_windows_csv(windows: &[WindowResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "start",
        "end",
        "uniform_spd",
        "dynamic_spd",
        "min_spd",
        "max_spd",
        "uniform_percentile",
        "dynamic_percentile",
        "excess_percentile",
        "relative_improvement_pct",
        "ratio",
        "win",
    ])?;

    for w in windows {
        let s = &w.spd;
        wtr.write_record([
            &w.start.to_string(),
            &w.end.to_string(),
            &format!("{:.4}", s.uniform_spd),
            &format!("{:.4}", s.dynamic_spd),
            &format!("{:.4}", s.min_spd),
            &format!("{:.4}", s.max_spd),
            &format!("{:.4}", s.uniform_percentile),
            &format!("{:.4}", s.dynamic_percentile),
            &format!("{:.4}", s.excess_percentile),
            &format!("{:.4}", s.relative_improvement_pct),
            &format!("{:.6}", s.ratio),
            &s.is_win().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Weight vector as CSV with columns date, weight, locked.
pub fn export_weights_csv(vector: &WeightVector) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "weight", "locked"])?;
    for (i, (date, weight)) in vector.iter().enumerate() {
        wtr.write_record([
            &date.to_string(),
            &format!("{:.12}", weight),
            &vector.is_locked(i).to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one backtest run.
///
/// Creates `backtest_{timestamp}/` under `output_dir` containing:
/// - `summary.json`: the full `BacktestReport`
/// - `windows.csv`: per-window results
/// - `report.md`: human-readable summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("backtest_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("summary.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("windows.csv"), export_windows_csv(&report.windows)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's summary.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("summary.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(report: &BacktestReport) -> String {
    let s = &report.summary;
    let mut md = String::with_capacity(1024);

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Window Days | {} |\n", report.window_days));
    if let (Some(first), Some(last)) = (report.windows.first(), report.windows.last()) {
        md.push_str(&format!("| Window Starts | {} to {} |\n", first.start, last.start));
    }
    md.push_str(&format!(
        "| Windows | {} ({} failed, {} skipped) |\n",
        s.window_count,
        report.failures.len(),
        report.skipped_windows
    ));
    md.push_str(&format!("| Signal Mode | {:?} |\n", report.signal_mode));
    if let Some(since) = report.valuation_since {
        md.push_str(&format!("| Valuation Since | {since} |\n"));
    }
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    md.push_str(&format!("| Config Hash | {} |\n", report.config_hash));
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }

    md.push_str("\n## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Model Score | {:.4} |\n", s.model_score));
    md.push_str(&format!(
        "| Win Rate | {:.2}% ({} / {}) |\n",
        s.win_rate * 100.0,
        s.win_count,
        s.window_count
    ));
    md.push_str(&format!(
        "| Recency-Weighted Percentile | {:.2} |\n",
        s.exp_decay_avg_percentile
    ));
    md.push_str(&format!(
        "| Mean Percentile (dynamic / uniform) | {:.2} / {:.2} |\n",
        s.dynamic_percentile.mean, s.uniform_percentile.mean
    ));
    md.push_str(&format!(
        "| Mean Excess Percentile | {:.2} |\n",
        s.mean_excess_percentile
    ));
    md.push_str(&format!(
        "| Median Relative Improvement | {:.2}% |\n",
        s.median_relative_improvement_pct
    ));
    md.push_str(&format!("| Mean SPD Ratio | {:.4} |\n", s.mean_ratio));

    if !report.failures.is_empty() {
        md.push_str("\n## Failed Windows\n\n");
        for f in report.failures.iter().take(20) {
            md.push_str(&format!("- {} to {}: {}\n", f.start, f.end, f.error));
        }
    }
    md
}

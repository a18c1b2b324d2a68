//! StackLab CLI: weight schedules, backtests and validation.
//!
//! Commands:
//! - `weights`: weight vector for one window as of a date, as CSV
//! - `backtest`: every complete window of a history, with artifacts
//! - `validate`: invariant, locking, leakage and win-rate checks

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use stacklab_core::window::WeightModel;
use stacklab_runner::export::{export_validation_json, export_weights_csv, save_artifacts};
use stacklab_runner::{
    generate_synthetic_history, load_csv, run_backtest, run_validation, BacktestReport, CsvColumns,
    LoadedHistory, RunConfig, ValidationReport,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stacklab",
    about = "StackLab CLI: dynamic DCA weighting engine and backtester"
)]
struct Cli {
    /// Log filter (e.g. `info`, `stacklab_runner=debug`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DataArgs {
    /// Daily CSV with `time`, `PriceUSD` and optional `CapMVRVCur` columns.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use a seeded synthetic history instead of a data file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Args)]
struct SyntheticArgs {
    /// Days of synthetic history.
    #[arg(long, default_value_t = 4000)]
    synthetic_days: usize,

    /// Seed for synthetic history.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the weight vector for one window.
    Weights {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        synthetic: SyntheticArgs,

        /// Window start (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Window end (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: NaiveDate,

        /// As-of date. Defaults to the earlier of `end` and the last history date.
        #[arg(long)]
        current_date: Option<NaiveDate>,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write CSV here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the backtest over every complete window.
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        synthetic: SyntheticArgs,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run the validation protocols. Exits non-zero if any check fails.
    Validate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        synthetic: SyntheticArgs,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write the validation report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Weights {
            data,
            synthetic,
            start,
            end,
            current_date,
            config,
            output,
        } => run_weights(&data, &synthetic, start, end, current_date, config, output),
        Commands::Backtest {
            data,
            synthetic,
            config,
            output_dir,
        } => run_backtest_cmd(&data, &synthetic, config, &output_dir),
        Commands::Validate {
            data,
            synthetic,
            config,
            output,
        } => run_validate(&data, &synthetic, config, output),
    }
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn load_history(data: &DataArgs, synthetic: &SyntheticArgs) -> Result<LoadedHistory> {
    match (&data.data, data.synthetic) {
        (Some(path), false) => load_csv(path, &CsvColumns::default())
            .with_context(|| format!("failed to load {}", path.display())),
        (None, true) => {
            let start = NaiveDate::from_ymd_opt(2013, 1, 1).context("invalid synthetic start")?;
            Ok(generate_synthetic_history(
                start,
                synthetic.synthetic_days,
                synthetic.seed,
            )?)
        }
        _ => bail!("exactly one of --data or --synthetic is required"),
    }
}

fn build_model(loaded: &LoadedHistory, config: &RunConfig) -> Result<WeightModel> {
    WeightModel::new(loaded.history.clone(), config.model.clone()).context("invalid model config")
}

fn run_weights(
    data: &DataArgs,
    synthetic: &SyntheticArgs,
    start: NaiveDate,
    end: NaiveDate,
    current_date: Option<NaiveDate>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_history(data, synthetic)?;
    let model = build_model(&loaded, &config)?;

    let as_of = current_date.unwrap_or_else(|| end.min(loaded.history.last_date()));
    let vector = model
        .compute_window_weights(start, end, as_of)
        .with_context(|| format!("failed to compute weights for [{start}, {end}] as of {as_of}"))?;
    let csv = export_weights_csv(&vector)?;

    match output {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), days = vector.len(), "wrote weights");
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_backtest_cmd(
    data: &DataArgs,
    synthetic: &SyntheticArgs,
    config_path: Option<PathBuf>,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_history(data, synthetic)?;
    let model = build_model(&loaded, &config)?;

    let report = run_backtest(&model, &config.backtest)?.tagged_synthetic(loaded.is_synthetic());
    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_validate(
    data: &DataArgs,
    synthetic: &SyntheticArgs,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_history(data, synthetic)?;
    let model = build_model(&loaded, &config)?;

    let (report, backtest) = run_validation(&model, &config)?;
    print_summary(&backtest.tagged_synthetic(loaded.is_synthetic()));
    print_validation(&report);

    if let Some(path) = output {
        std::fs::write(&path, export_validation_json(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Validation report saved to: {}", path.display());
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    let s = &report.summary;
    println!();
    println!("=== Backtest Result ===");
    if let (Some(first), Some(last)) = (report.windows.first(), report.windows.last()) {
        println!("Window Starts:  {} to {}", first.start, last.start);
    }
    println!("Window Days:    {}", report.window_days);
    println!(
        "Windows:        {} ({} failed, {} skipped)",
        s.window_count,
        report.failures.len(),
        report.skipped_windows
    );
    println!("Signal Mode:    {:?}", report.signal_mode);
    if let Some(since) = report.valuation_since {
        println!("Valuation From: {since}");
    }
    println!();
    println!("--- Performance ---");
    println!("Model Score:    {:.4}", s.model_score);
    println!(
        "Win Rate:       {:.2}% ({} / {})",
        s.win_rate * 100.0,
        s.win_count,
        s.window_count
    );
    println!("Decay Pctl:     {:.2}", s.exp_decay_avg_percentile);
    println!(
        "Mean Pctl:      {:.2} dynamic / {:.2} uniform",
        s.dynamic_percentile.mean, s.uniform_percentile.mean
    );
    println!("Excess Pctl:    {:.2}", s.mean_excess_percentile);
    println!(
        "Rel. Improve:   {:.2}% median",
        s.median_relative_improvement_pct
    );
    if report.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_validation(report: &ValidationReport) {
    println!("=== Validation ===");
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!(
            "{status}  {:<18} {} cases, {} failed",
            check.name, check.cases, check.failed_cases
        );
        for failure in &check.failures {
            println!("      - {failure}");
        }
    }
    println!();
    if report.all_passed() {
        println!("All checks passed.");
    } else {
        println!("Validation FAILED.");
    }
}

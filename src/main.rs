//! Pension Analyzer CLI
//!
//! Loads extracts, cashflows and index series from CSV files and reports
//! returns, benchmark comparisons and an optional forecast.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use pension_analyzer::forecast::{deflate_forecast, growth_rate_mid};
use pension_analyzer::reconcile::PartialHistory;
use pension_analyzer::returns::SummaryStats;
use pension_analyzer::series::{load_cashflows, load_index, load_snapshots};
use pension_analyzer::{
    AccountAnalyzer, DeflationSettings, Deflator, ForecastAssumptions, ForecastMethod, ForecastPoint, ForecastRate,
    IndexSeries, Partition, ReconcileConfig, SimulationConfig,
};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Mean of the last 12 monthly contribution totals
    Mean,
    /// Linear trend over the last 12 monthly totals
    Trend,
}

impl From<MethodArg> for ForecastMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Mean => ForecastMethod::MeanOfRecentContributions,
            MethodArg::Trend => ForecastMethod::StatisticalExtrapolation,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pension_analyzer", version, about = "Pension account return and benchmark analysis")]
struct Cli {
    /// Snapshot CSV, one per extract (date,quota_count,unit_value[,position])
    #[arg(long = "snapshots", required = true)]
    snapshots: Vec<PathBuf>,

    /// Cashflow CSV (date,amount,category)
    #[arg(long)]
    cashflows: PathBuf,

    /// Benchmark index CSV (date,value); repeat for several benchmarks
    #[arg(long = "benchmark")]
    benchmarks: Vec<PathBuf>,

    /// Inflation index CSV used for deflation
    #[arg(long)]
    inflation: Option<PathBuf>,

    /// Report values in money of this date (requires --inflation)
    #[arg(long)]
    deflate_to: Option<NaiveDate>,

    /// Quota total reported on the statement, to detect history before the first extract
    #[arg(long)]
    reported_quotas: Option<f64>,

    /// Replay only the participant's own contributions
    #[arg(long)]
    participant_only: bool,

    /// Fail on any partition boundary mismatch
    #[arg(long)]
    strict: bool,

    /// Forecast horizon in years (0 disables the forecast)
    #[arg(long, default_value_t = 0)]
    forecast_years: u32,

    /// Real annual growth of the monthly contribution (defaults to the mid salary preset)
    #[arg(long)]
    growth: Option<f64>,

    /// Fixed annual forecast rate instead of the account's own return
    #[arg(long)]
    forecast_rate: Option<f64>,

    #[arg(long, value_enum, default_value_t = MethodArg::Mean)]
    method: MethodArg,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BenchmarkLine {
    name: String,
    final_position: Option<f64>,
    total_contributed: Option<f64>,
    cagr: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    summary: SummaryStats,
    reconcile_warnings: usize,
    deflated_to: Option<NaiveDate>,
    benchmarks: Vec<BenchmarkLine>,
    forecast: Vec<ForecastPoint>,
}

fn env_f64(name: &str, default: f64) -> anyhow::Result<f64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

fn load_series(path: &Path) -> anyhow::Result<IndexSeries> {
    load_index(path).map_err(|e| anyhow!("loading index {}: {}", path.display(), e))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    // Simulation knobs from environment, like the batch runners
    let mut sim_config = if cli.participant_only {
        SimulationConfig::participant_only()
    } else {
        SimulationConfig::default()
    };
    sim_config.overhead_annual_rate = env_f64("OVERHEAD_RATE", sim_config.overhead_annual_rate)?;
    sim_config.company_match_ratio = env_f64("COMPANY_MATCH_RATIO", sim_config.company_match_ratio)?;
    sim_config.validate()?;

    let mut partitions = Vec::with_capacity(cli.snapshots.len());
    for path in &cli.snapshots {
        let snapshots = load_snapshots(path).map_err(|e| anyhow!("loading snapshots {}: {}", path.display(), e))?;
        let label = path.file_stem().and_then(|s| s.to_str()).unwrap_or("extract");
        partitions.push(Partition::new(label, snapshots));
    }
    let cashflows = load_cashflows(&cli.cashflows)
        .map_err(|e| anyhow!("loading cashflows {}: {}", cli.cashflows.display(), e))?;
    info!("Loaded {} extracts and {} cashflows", partitions.len(), cashflows.len());

    let (mut account, warnings) = AccountAnalyzer::from_partitions(&partitions, cashflows, &ReconcileConfig::default())
        .context("reconciling extracts")?;
    if cli.strict {
        if let Some(first) = warnings.first() {
            return Err(pension_analyzer::EngineError::from(first).into());
        }
    }

    if let Some(reported) = cli.reported_quotas {
        let visible = account.last_snapshot().quota_count;
        let first_unit = account.snapshots()[0].unit_value;
        if let Some(partial) = PartialHistory::detect(reported, visible, first_unit) {
            warn!(
                "Extract starts after account opening: {:.4} quotas missing, valued at {:.6}",
                partial.missing_quotas, partial.first_unit_value
            );
            account = account.with_partial_history(partial);
        }
    }

    let inflation = cli.inflation.as_deref().map(load_series).transpose()?;
    let deflation = match (cli.deflate_to, &inflation) {
        (Some(date), Some(index)) => Some((DeflationSettings::enabled_at(date), index)),
        (Some(_), None) => bail!("--deflate-to requires --inflation"),
        _ => None,
    };
    let nominal = account.clone();
    if let Some((settings, index)) = &deflation {
        account = account.deflated(index, settings);
    }

    let summary = account.summary().context("computing account summary")?;

    let benchmarks: Vec<IndexSeries> = cli
        .benchmarks
        .iter()
        .map(|path| load_series(path))
        .collect::<anyhow::Result<_>>()?;

    // Benchmarks are independent: replay them in parallel
    let lines: Vec<BenchmarkLine> = benchmarks
        .par_iter()
        .map(|index| {
            let replay = match &deflation {
                Some((settings, inflation)) => {
                    let real_index = deflate_index(index, inflation, settings.reference_date);
                    real_index.and_then(|idx| account.benchmark(&idx, &sim_config))
                }
                None => account.benchmark(index, &sim_config),
            };
            match replay {
                Ok(result) => BenchmarkLine {
                    name: result.name,
                    final_position: Some(result.final_position),
                    total_contributed: Some(result.total_contributed),
                    cagr: Some(result.cagr),
                    error: None,
                },
                Err(e) => BenchmarkLine {
                    name: index.name().to_string(),
                    final_position: None,
                    total_contributed: None,
                    cagr: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    let forecast = if cli.forecast_years > 0 {
        let rate = match cli.forecast_rate {
            Some(rate) => ForecastRate::Fixed(rate),
            None => nominal.historical_rate().context("estimating historical rate")?,
        };
        let assumptions = ForecastAssumptions::years(cli.forecast_years, rate)
            .with_growth(cli.growth.unwrap_or_else(growth_rate_mid))
            .with_method(cli.method.into());
        let points = nominal.forecast(&assumptions, &sim_config).context("forecasting")?;
        match &deflation {
            Some((settings, index)) => deflate_forecast(&points, index, settings.reference_date),
            None => points,
        }
    } else {
        Vec::new()
    };

    let report = Report {
        summary,
        reconcile_warnings: warnings.len(),
        deflated_to: deflation.as_ref().map(|(settings, _)| settings.reference_date),
        benchmarks: lines,
        forecast,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    info!("Done in {:?}", start.elapsed());
    Ok(())
}

/// Benchmark index in reference-date money
fn deflate_index(
    index: &IndexSeries,
    inflation: &IndexSeries,
    reference_date: NaiveDate,
) -> pension_analyzer::Result<IndexSeries> {
    let deflator = Deflator::new(inflation, reference_date);
    index.map_values(format!("{} (real)", index.name()), |date, value| deflator.deflate(value, date))
}

fn print_report(report: &Report) {
    let s = &report.summary;
    println!("Pension Analyzer v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");

    if let Some(date) = report.deflated_to {
        println!("Values in money of {}", date);
    }
    println!("Position on {}: R$ {:.2}", s.last_date, s.last_position);
    println!("  Contributed:  R$ {:.2}", s.total_contributed);
    println!("  Total return: R$ {:.2}", s.total_return);
    match s.cagr {
        Some(cagr) => println!("  CAGR:         {:.2}% a.a.", cagr * 100.0),
        None => println!("  CAGR:         n/a"),
    }
    if report.reconcile_warnings > 0 {
        println!("  ({} reconciliation warnings, see log)", report.reconcile_warnings);
    }

    if !report.benchmarks.is_empty() {
        println!("\nBenchmarks:");
        println!("{:<28} {:>16} {:>12}", "Name", "Final", "CAGR");
        println!("{}", "-".repeat(58));
        for line in &report.benchmarks {
            match (&line.error, line.final_position, line.cagr) {
                (None, Some(position), Some(cagr)) => {
                    println!("{:<28} {:>16.2} {:>11.2}%", line.name, position, cagr * 100.0)
                }
                (error, _, _) => println!("{:<28} error: {}", line.name, error.as_deref().unwrap_or("unknown")),
            }
        }
    }

    if !report.forecast.is_empty() {
        println!("\nForecast ({} months):", report.forecast.len());
        println!("{:>12} {:>12} {:>16} {:>16} {:>16}", "Date", "Contrib", "Position", "Lower", "Upper");
        for point in report.forecast.iter().filter(|p| p.date.month() == 12) {
            println!(
                "{:>12} {:>12.2} {:>16.2} {:>16.2} {:>16.2}",
                point.date, point.contribution, point.position, point.lower, point.upper
            );
        }
        if let Some(last) = report.forecast.last() {
            println!("Final {}: R$ {:.2}", last.date, last.position);
        }
    }
}

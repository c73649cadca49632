//! Replay one account into a benchmark across a range of overhead rates
//!
//! Usage: overhead_sweep <snapshots.csv> <cashflows.csv> <index.csv> [--json]
//!
//! Rates come from OVERHEAD_RATES (comma separated annual rates, default
//! "index + 0%" through "index + 10%"). Results go to stdout and
//! overhead_sweep.csv (override with OUTPUT_CSV).

use std::env;
use std::fs::File;
use std::io::Write;
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use pension_analyzer::series::{load_cashflows, load_index, load_snapshots};
use pension_analyzer::{AccountAnalyzer, SimulationConfig};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SweepRow {
    overhead_annual_rate: f64,
    final_position: f64,
    cagr: f64,
    /// Benchmark final position minus the account's
    difference: f64,
}

fn default_rates() -> Vec<f64> {
    // Negative overhead adds performance: "index + x%"
    (0..=10).map(|pct| -(pct as f64) / 100.0).collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let json_output = env::args().any(|arg| arg == "--json");
    let paths: Vec<String> = env::args().skip(1).filter(|arg| !arg.starts_with("--")).collect();
    if paths.len() != 3 {
        bail!("usage: overhead_sweep <snapshots.csv> <cashflows.csv> <index.csv> [--json]");
    }
    let start = Instant::now();

    let rates: Vec<f64> = match env::var("OVERHEAD_RATES") {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .context("OVERHEAD_RATES must be comma separated numbers")?,
        Err(_) => default_rates(),
    };
    let company_match_ratio: f64 = env::var("COMPANY_MATCH_RATIO")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1.0);
    let output_csv = env::var("OUTPUT_CSV").unwrap_or_else(|_| "overhead_sweep.csv".to_string());

    let snapshots = load_snapshots(&paths[0]).map_err(|e| anyhow!("loading {}: {}", paths[0], e))?;
    let cashflows = load_cashflows(&paths[1]).map_err(|e| anyhow!("loading {}: {}", paths[1], e))?;
    let index = load_index(&paths[2]).map_err(|e| anyhow!("loading {}: {}", paths[2], e))?;

    let account = AccountAnalyzer::new(snapshots, cashflows)?;
    let account_final = account.last_snapshot().position;

    let base = SimulationConfig {
        company_match_ratio,
        ..SimulationConfig::default()
    };

    // Each rate is an independent replay
    let rows: Vec<SweepRow> = rates
        .par_iter()
        .map(|&rate| -> pension_analyzer::Result<SweepRow> {
            let result = account.benchmark(&index, &base.with_overhead(rate))?;
            Ok(SweepRow {
                overhead_annual_rate: rate,
                final_position: result.final_position,
                cagr: result.cagr,
                difference: result.final_position - account_final,
            })
        })
        .collect::<pension_analyzer::Result<_>>()?;

    let mut file = File::create(&output_csv).with_context(|| format!("creating {}", output_csv))?;
    writeln!(file, "OverheadRate,FinalPosition,CAGR,Difference")?;
    for row in &rows {
        writeln!(
            file,
            "{:.6},{:.2},{:.8},{:.2}",
            row.overhead_annual_rate, row.final_position, row.cagr, row.difference
        )?;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{} vs account final R$ {:.2}", index.name(), account_final);
        println!("{:>10} {:>16} {:>10} {:>16}", "Overhead", "Final", "CAGR", "Difference");
        for row in &rows {
            println!(
                "{:>9.2}% {:>16.2} {:>9.2}% {:>16.2}",
                row.overhead_annual_rate * 100.0,
                row.final_position,
                row.cagr * 100.0,
                row.difference
            );
        }
        println!("\nWritten {} rows to {} in {:?}", rows.len(), output_csv, start.elapsed());
    }
    Ok(())
}

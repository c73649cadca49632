//! End to end: CSV extracts through reconciliation, benchmarks, deflation and forecast

use approx::assert_relative_eq;
use chrono::NaiveDate;
use pension_analyzer::reconcile::reconcile;
use pension_analyzer::series::loader::{load_cashflows_from_reader, load_index_from_reader, load_snapshots_from_reader};
use pension_analyzer::{
    AccountAnalyzer, DeflationSettings, EngineError, ForecastAssumptions, ForecastRate, IndexSeries, Partition,
    ReconcileConfig, SimulationConfig,
};

fn month_end(y: i32, m: u32) -> NaiveDate {
    let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1).unwrap().pred_opt().unwrap()
}

fn unit(month: u32) -> f64 {
    1.005_f64.powi(month as i32)
}

/// Extract CSV for `months`, quota counts local to the extract
fn extract_csv(months: std::ops::RangeInclusive<u32>, unit_shift: f64) -> String {
    let mut csv = String::from("date,quota_count,unit_value\n");
    let mut quotas = 0.0;
    for m in months {
        quotas += 1500.0 / unit(m);
        csv.push_str(&format!("{},{},{}\n", month_end(2023, m), quotas, unit(m) * unit_shift));
    }
    csv
}

fn cashflows_csv() -> String {
    let mut csv = String::from("date,amount,category\n");
    for m in 1..=12 {
        csv.push_str(&format!("{},-1000.0,participante\n", month_end(2023, m)));
        csv.push_str(&format!("{},-500.0,patrocinador\n", month_end(2023, m)));
    }
    csv
}

fn fund_index_csv() -> String {
    let mut csv = String::from("date,value\n2022-12-31,1.0\n");
    for m in 1..=12 {
        csv.push_str(&format!("{},{}\n", month_end(2023, m), unit(m)));
    }
    csv
}

fn account() -> AccountAnalyzer {
    let first = load_snapshots_from_reader(extract_csv(1..=6, 1.0).as_bytes()).unwrap();
    let second = load_snapshots_from_reader(extract_csv(7..=12, 1.0).as_bytes()).unwrap();
    let cashflows = load_cashflows_from_reader(cashflows_csv().as_bytes()).unwrap();

    let partitions = vec![Partition::new("2023-h2", second), Partition::new("2023-h1", first)];
    let (account, warnings) = AccountAnalyzer::from_partitions(&partitions, cashflows, &ReconcileConfig::default()).unwrap();
    assert!(warnings.is_empty());
    account
}

fn fund_index() -> IndexSeries {
    load_index_from_reader("fund", fund_index_csv().as_bytes()).unwrap()
}

#[test]
fn test_stitched_extracts_replay_exactly_in_own_fund() {
    let account = account();
    assert_eq!(account.snapshots().len(), 12);

    let summary = account.summary().unwrap();
    assert_relative_eq!(summary.total_contributed, 18_000.0, max_relative = 1e-12);

    let replay = account.benchmark(&fund_index(), &SimulationConfig::default()).unwrap();
    assert_relative_eq!(replay.final_position, summary.last_position, max_relative = 1e-9);
    assert_relative_eq!(replay.cagr, summary.cagr.unwrap(), epsilon = 1e-6);
    assert_relative_eq!(replay.cagr, 1.005_f64.powi(12) - 1.0, epsilon = 2e-3);
}

#[test]
fn test_participant_only_replay_scales_down() {
    let account = account();
    let full = account.benchmark(&fund_index(), &SimulationConfig::default()).unwrap();
    let own = account.benchmark(&fund_index(), &SimulationConfig::participant_only()).unwrap();

    assert_relative_eq!(own.final_position, full.final_position * 2.0 / 3.0, max_relative = 1e-9);
    assert_relative_eq!(own.cagr, full.cagr, epsilon = 1e-6);
}

#[test]
fn test_overhead_drag_lowers_benchmark() {
    let account = account();
    let plain = account.benchmark(&fund_index(), &SimulationConfig::default()).unwrap();
    let dragged = account
        .benchmark(&fund_index(), &SimulationConfig::default().with_overhead(0.01))
        .unwrap();
    assert!(dragged.final_position < plain.final_position);
}

#[test]
fn test_flat_inflation_leaves_figures_unchanged() {
    let account = account();
    let flat = IndexSeries::new("ipca", vec![(month_end(2022, 12), 1.0)]).unwrap();
    let real = account.deflated(&flat, &DeflationSettings::enabled_at(month_end(2023, 12)));

    let nominal = account.summary().unwrap();
    let deflated = real.summary().unwrap();
    assert_relative_eq!(deflated.last_position, nominal.last_position, max_relative = 1e-12);
    assert_relative_eq!(deflated.total_contributed, nominal.total_contributed, max_relative = 1e-12);
}

#[test]
fn test_forecast_continues_from_last_position() {
    let account = account();
    let assumptions = ForecastAssumptions::years(2, ForecastRate::Fixed(0.0));
    let points = account.forecast(&assumptions, &SimulationConfig::default()).unwrap();

    assert_eq!(points.len(), 24);
    assert_eq!(points[0].date, month_end(2024, 1));
    assert_relative_eq!(points[0].contribution, 1500.0, epsilon = 1e-9);
    let last = account.last_snapshot().position;
    assert_relative_eq!(points[23].position, last + 24.0 * 1500.0, max_relative = 1e-12);
}

#[test]
fn test_repriced_extract_is_flagged() {
    let first = load_snapshots_from_reader(extract_csv(1..=6, 1.0).as_bytes()).unwrap();
    let second = load_snapshots_from_reader(extract_csv(7..=12, 1.10).as_bytes()).unwrap();
    let partitions = vec![Partition::new("h1", first), Partition::new("h2", second)];

    let reconciled = reconcile(&partitions, &ReconcileConfig::default());
    assert_eq!(reconciled.snapshots.len(), 12);
    assert!(reconciled.has_warnings());
    assert!(matches!(reconciled.into_strict(), Err(EngineError::PartitionMismatch { .. })));
}

//! Replay the account's contribution schedule against a benchmark index

use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use super::config::SimulationConfig;
use crate::error::{EngineError, Result};
use crate::returns::contribution_cagr;
use crate::series::{CashflowEvent, IndexSeries, PositionSnapshot};

/// Counterfactual account invested in a benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Benchmark name (overhead included)
    pub name: String,
    /// Simulated position at every valuation date
    pub snapshots: Vec<PositionSnapshot>,
    /// Contributions actually replayed, after folding
    pub contributions: Vec<CashflowEvent>,
    pub total_contributed: f64,
    pub final_position: f64,
    pub final_date: NaiveDate,
    /// Annualized return over the replayed contributions and final position
    pub cagr: f64,
}

/// Valuation dates for a replay: account snapshot dates from the month of
/// the first contribution onward
pub fn valuation_dates_for(snapshots: &[PositionSnapshot], contributions: &[CashflowEvent]) -> Vec<NaiveDate> {
    let first_month = contributions
        .iter()
        .filter(|c| c.is_contribution())
        .map(|c| (c.date.year(), c.date.month()))
        .min();

    snapshots
        .iter()
        .map(|s| s.date)
        .filter(|date| match first_month {
            Some(month) => (date.year(), date.month()) >= month,
            None => true,
        })
        .collect()
}

/// Replay `contributions` into `index` and value the holding at each of `valuation_dates`
///
/// Each folded contribution buys `amount / index(date)` benchmark quotas;
/// the position at a valuation date is `quotas x index(date)`, both on the
/// overhead-adjusted index. Fails with `IndexUnavailable` if any
/// contribution or valuation date precedes the index's first observation.
pub fn simulate(
    contributions: &[CashflowEvent],
    index: &IndexSeries,
    valuation_dates: &[NaiveDate],
    config: &SimulationConfig,
) -> Result<SimulationResult> {
    config.validate()?;

    let folded = config.fold_contributions(contributions);
    if folded.is_empty() {
        return Err(EngineError::InvalidCashflowSet("no contributions to replay".to_string()));
    }

    let mut dates = valuation_dates.to_vec();
    dates.sort();
    dates.dedup();
    let (Some(&first_valuation), Some(&last_valuation)) = (dates.first(), dates.last()) else {
        return Err(EngineError::InvalidSeries("no valuation dates".to_string()));
    };

    let requested_start = folded[0].date.min(first_valuation);
    let requested_end = folded[folded.len() - 1].date.max(last_valuation);
    index.require_coverage(requested_start, requested_end)?;

    let adjusted = config.apply_overhead(index)?;

    let mut quotas = 0.0;
    let mut next = 0;
    let mut snapshots = Vec::with_capacity(dates.len());

    for &date in &dates {
        // Buy with every contribution made on or before this valuation date
        while next < folded.len() && folded[next].date <= date {
            let contribution = &folded[next];
            quotas += contribution.contributed() / adjusted.value_at(contribution.date);
            next += 1;
        }
        snapshots.push(PositionSnapshot::new(date, quotas, adjusted.value_at(date)));
    }

    if next < folded.len() {
        debug!(
            "{} contributions after last valuation date {} not replayed",
            folded.len() - next,
            last_valuation
        );
    }
    let replayed: Vec<CashflowEvent> = folded.into_iter().take(next).collect();

    let final_position = snapshots.last().map(|s| s.position).unwrap_or(0.0);
    let cagr = contribution_cagr(&replayed, last_valuation, final_position)?;

    Ok(SimulationResult {
        name: adjusted.name().to_string(),
        total_contributed: replayed.iter().map(|c| c.contributed()).sum(),
        contributions: replayed,
        snapshots,
        final_position,
        final_date: last_valuation,
        cagr,
    })
}

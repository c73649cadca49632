//! Account statistics over a full history or a selected date range

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::xirr::contribution_cagr;
use crate::error::{EngineError, Result};
use crate::series::{CashflowEvent, PositionSnapshot};

/// Headline figures for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub last_position: f64,
    pub last_date: NaiveDate,
    pub total_contributed: f64,
    pub total_return: f64,
    /// Annualized return; `None` when there are no contributions to solve over
    pub cagr: Option<f64>,
}

/// Summary over the whole history
pub fn summary_stats(snapshots: &[PositionSnapshot], contributions: &[CashflowEvent]) -> Result<SummaryStats> {
    let last = snapshots
        .last()
        .ok_or_else(|| EngineError::InvalidSeries("no position snapshots".to_string()))?;

    let total_contributed: f64 = contributions.iter().map(|c| c.contributed()).sum();
    let cagr = if contributions.iter().any(|c| c.is_contribution()) {
        Some(contribution_cagr(contributions, last.date, last.position)?)
    } else {
        None
    };

    Ok(SummaryStats {
        last_position: last.position,
        last_date: last.date,
        total_contributed,
        total_return: last.position - total_contributed,
        cagr,
    })
}

/// Snapshots and contributions restricted to a date range
#[derive(Debug, Clone)]
pub struct PeriodSlice {
    pub snapshots: Vec<PositionSnapshot>,
    /// Contributions from the start month through the end month
    pub contributions: Vec<CashflowEvent>,
    /// Last snapshot strictly before the range, if any
    pub before_start: Option<PositionSnapshot>,
}

impl PeriodSlice {
    pub fn position_before_start(&self) -> f64 {
        self.before_start.map(|s| s.position).unwrap_or(0.0)
    }

    /// Period start: the snapshot before the range, or the first one inside it
    pub fn period_start(&self) -> Option<NaiveDate> {
        self.before_start
            .map(|s| s.date)
            .or_else(|| self.snapshots.first().map(|s| s.date))
    }

    pub fn period_end(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.date)
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Restrict history to `[start, end]`
///
/// Snapshots are filtered by date; contributions by calendar month so that
/// every contribution made in the start month is included.
pub fn slice_range(
    snapshots: &[PositionSnapshot],
    contributions: &[CashflowEvent],
    start: NaiveDate,
    end: NaiveDate,
) -> PeriodSlice {
    let in_range: Vec<PositionSnapshot> = snapshots
        .iter()
        .filter(|s| s.date >= start && s.date <= end)
        .copied()
        .collect();

    let contributions = contributions
        .iter()
        .filter(|c| month_key(c.date) >= month_key(start) && month_key(c.date) <= month_key(end))
        .copied()
        .collect();

    let before_start = in_range
        .first()
        .and_then(|first| snapshots.iter().filter(|s| s.date < first.date).last().copied());

    PeriodSlice {
        snapshots: in_range,
        contributions,
        before_start,
    }
}

/// Modified Dietz return for one period
///
/// `r = (end - start - sum(c)) / (start + sum(c * w))` where `w` is the share
/// of the period remaining after each contribution, clamped to [0, 1].
/// Returns `(r, value of the contributions at period end)`, the latter being
/// `sum(c * (1 + r * w))`.
pub fn modified_dietz(
    contributions: &[CashflowEvent],
    start_position: f64,
    end_position: f64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> (f64, f64) {
    let flows: Vec<&CashflowEvent> = contributions.iter().filter(|c| c.is_contribution()).collect();

    if flows.is_empty() {
        if start_position > 0.0 {
            return (end_position / start_position - 1.0, 0.0);
        }
        return (0.0, 0.0);
    }

    let total_days = ((period_end - period_start).num_days()).max(1) as f64;
    let weighted: Vec<(f64, f64)> = flows
        .iter()
        .map(|c| {
            let remaining = (period_end - c.date).num_days() as f64;
            (c.contributed(), (remaining / total_days).clamp(0.0, 1.0))
        })
        .collect();

    let total_contributions: f64 = weighted.iter().map(|(c, _)| c).sum();
    let weighted_sum: f64 = weighted.iter().map(|(c, w)| c * w).sum();

    let denominator = start_position + weighted_sum;
    if denominator <= 0.0 {
        return (0.0, total_contributions);
    }

    let rate = (end_position - start_position - total_contributions) / denominator;
    let grown: f64 = weighted.iter().map(|(c, w)| c * (1.0 + rate * w)).sum();
    (rate, grown)
}

/// Return figures for a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodReturn {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Total position at period end, hidden quotas included
    pub end_position: f64,
    pub invested: f64,
    /// Growth of the period's contributions minus the amount invested
    pub total_return: f64,
    pub cagr: Option<f64>,
}

/// Returns for `[start, end]`, measuring only the period's own contributions
///
/// Quotas held before the range (either `missing_quotas` from a partial
/// extract, or everything held before `start`) are valued at the period-end
/// unit price and excluded, so the rate reflects visible contributions only.
pub fn period_return(
    snapshots: &[PositionSnapshot],
    contributions: &[CashflowEvent],
    start: NaiveDate,
    end: NaiveDate,
    missing_quotas: f64,
) -> Result<PeriodReturn> {
    let slice = slice_range(snapshots, contributions, start, end);
    let (Some(period_start), Some(last)) = (slice.period_start(), slice.snapshots.last().copied()) else {
        return Err(EngineError::InvalidSeries(format!("no snapshots between {} and {}", start, end)));
    };

    // Quotas held before the range replace the extract's missing quotas,
    // since the earlier position already includes them
    let hidden_quotas = match slice.before_start {
        Some(before) if before.position > 0.0 && before.unit_value > 0.0 => before.position / before.unit_value,
        _ => missing_quotas,
    };

    let (start_position, end_position) = if hidden_quotas > 0.0 {
        (0.0, last.position - hidden_quotas * last.unit_value)
    } else {
        (slice.position_before_start(), last.position)
    };

    let (_, grown) = modified_dietz(&slice.contributions, start_position, end_position, period_start, last.date);
    let invested: f64 = slice.contributions.iter().map(|c| c.contributed()).sum();

    let cagr = if slice.contributions.iter().any(|c| c.is_contribution()) {
        Some(contribution_cagr(&slice.contributions, last.date, grown)?)
    } else {
        None
    };

    Ok(PeriodReturn {
        period_start,
        period_end: last.date,
        end_position: last.position,
        invested,
        total_return: grown - invested,
        cagr,
    })
}

//! Monthly forecast of contributions and position beyond the last snapshot

use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use super::assumptions::{ForecastAssumptions, ForecastMethod, LOOKBACK_MONTHS};
use crate::error::{EngineError, Result};
use crate::series::{CashflowEvent, IndexSeries, PositionSnapshot};

/// One projected month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Month-end date
    pub date: NaiveDate,
    pub contribution: f64,
    pub position: f64,
    pub lower: f64,
    pub upper: f64,
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Last day of the month `index` months after year 0 January
fn month_end(index: i32) -> Option<NaiveDate> {
    let next = index + 1;
    NaiveDate::from_ymd_opt(next.div_euclid(12), next.rem_euclid(12) as u32 + 1, 1)?.pred_opt()
}

/// Contribution totals per calendar month, from the first to the last
/// contribution month, with zero for months without any
pub fn monthly_contribution_totals(contributions: &[CashflowEvent]) -> Vec<f64> {
    let months: Vec<(i32, f64)> = contributions
        .iter()
        .filter(|c| c.is_contribution())
        .map(|c| (month_index(c.date), c.contributed()))
        .collect();

    let (Some(first), Some(last)) = (
        months.iter().map(|&(m, _)| m).min(),
        months.iter().map(|&(m, _)| m).max(),
    ) else {
        return Vec::new();
    };

    let mut totals = vec![0.0; (last - first + 1) as usize];
    for (month, amount) in months {
        totals[(month - first) as usize] += amount;
    }
    totals
}

/// Starting monthly contribution estimated from the most recent monthly totals
pub fn baseline_contribution(monthly_totals: &[f64], method: ForecastMethod) -> f64 {
    let recent = &monthly_totals[monthly_totals.len().saturating_sub(LOOKBACK_MONTHS)..];
    if recent.is_empty() {
        return 0.0;
    }
    let n = recent.len() as f64;
    let mean = recent.iter().sum::<f64>() / n;

    match method {
        ForecastMethod::MeanOfRecentContributions => mean,
        ForecastMethod::StatisticalExtrapolation => {
            if recent.len() < 2 {
                return mean.max(0.0);
            }
            // OLS on x = 0..n-1, evaluated at x = n
            let x_mean = (n - 1.0) / 2.0;
            let (mut sxy, mut sxx) = (0.0, 0.0);
            for (i, &y) in recent.iter().enumerate() {
                let dx = i as f64 - x_mean;
                sxy += dx * (y - mean);
                sxx += dx * dx;
            }
            let slope = sxy / sxx;
            (mean + slope * (n - x_mean)).max(0.0)
        }
    }
}

/// Project the account `assumptions.horizon_months` months past its last snapshot
///
/// Month `k` (from 0) contributes `S0 * exp(g * k / 12)`, then the position
/// grows one month: `position = (position + contribution) * (1 + rate)^(1/12)`.
pub fn forecast(
    snapshots: &[PositionSnapshot],
    contributions: &[CashflowEvent],
    assumptions: &ForecastAssumptions,
) -> Result<Vec<ForecastPoint>> {
    assumptions.validate()?;
    let last = snapshots
        .last()
        .ok_or_else(|| EngineError::InvalidSeries("forecast needs at least one snapshot".to_string()))?;

    if assumptions.horizon_months == 0 {
        return Ok(Vec::new());
    }

    let totals = monthly_contribution_totals(contributions);
    let baseline = baseline_contribution(&totals, assumptions.method);
    let growth_factor = assumptions.rate.monthly_factor();
    debug!(
        "forecast {} months from {}: S0={:.2}, rate={:.4}",
        assumptions.horizon_months,
        last.date,
        baseline,
        assumptions.rate.annual()
    );

    let start = month_index(last.date);
    let band = assumptions.uncertainty_band;
    let mut position = last.position;
    let mut points = Vec::with_capacity(assumptions.horizon_months as usize);

    for k in 0..assumptions.horizon_months {
        let date = month_end(start + 1 + k as i32)
            .ok_or_else(|| EngineError::InvalidConfig(format!("forecast month {} out of date range", k)))?;
        let elapsed_years = k as f64 / 12.0;
        let contribution = baseline * (assumptions.contribution_growth_rate * elapsed_years).exp();
        position = (position + contribution) * growth_factor;

        points.push(ForecastPoint {
            date,
            contribution,
            position,
            lower: position * (1.0 - band),
            upper: position * (1.0 + band),
        });
    }

    Ok(points)
}

/// Forecast in reference-date money, extending the inflation index past its
/// last observation at its own historical rate
pub fn deflate_forecast(points: &[ForecastPoint], inflation: &IndexSeries, reference_date: NaiveDate) -> Vec<ForecastPoint> {
    let reference = inflation.value_at(reference_date);
    points
        .iter()
        .map(|p| {
            let factor = reference / inflation.value_extrapolated(p.date);
            ForecastPoint {
                date: p.date,
                contribution: p.contribution * factor,
                position: p.position * factor,
                lower: p.lower * factor,
                upper: p.upper * factor,
            }
        })
        .collect()
}

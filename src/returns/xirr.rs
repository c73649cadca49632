//! Internal Rate of Return for irregularly dated cashflows (XIRR)
//!
//! Time offsets use the 252-business-day convention from [`crate::daycount`],
//! so rates are directly comparable with the benchmark and forecast figures.

use chrono::NaiveDate;
use log::debug;

use crate::daycount::year_fraction;
use crate::error::{EngineError, Result};
use crate::series::CashflowEvent;

/// Newton-Raphson solver with a bracketing bisection fallback
#[derive(Debug, Clone)]
pub struct XirrSolver {
    /// Newton seed (annual rate)
    pub initial_guess: f64,
    /// Absolute NPV tolerance for convergence
    pub npv_tolerance: f64,
    /// Newton step / bracket width at which the rate is considered exact
    pub rate_tolerance: f64,
    pub max_newton_iterations: u32,
    pub max_bisection_iterations: u32,
    /// Search domain for the fallback (annual rates)
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Grid spacing used to find a sign change before bisecting
    pub bracket_step: f64,
}

impl Default for XirrSolver {
    fn default() -> Self {
        Self {
            initial_guess: 0.10,
            npv_tolerance: 1e-6,
            rate_tolerance: 1e-12,
            max_newton_iterations: 100,
            max_bisection_iterations: 200,
            lower_bound: -0.99, // -99%
            upper_bound: 10.0,  // 1000%
            bracket_step: 0.005,
        }
    }
}

impl XirrSolver {
    /// Solve for the annual rate that zeroes the NPV of `flows`
    ///
    /// When the cashflow signs change more than once there can be several
    /// roots. Newton returns whichever it converges to from the seed; the
    /// fallback returns the sign-changing bracket closest to the seed. No
    /// further tie-break is attempted.
    pub fn solve(&self, flows: &[(NaiveDate, f64)]) -> Result<f64> {
        let timed = time_offsets(flows)?;

        if let Some(rate) = self.newton(&timed) {
            return Ok(rate);
        }

        debug!("Newton did not converge for {} cashflows, falling back to bisection", timed.len());
        self.bracket_search(&timed)
    }

    fn newton(&self, timed: &[(f64, f64)]) -> Option<f64> {
        let mut rate = self.initial_guess;

        for _ in 0..self.max_newton_iterations {
            let (npv, dnpv) = npv_and_derivative(timed, rate);

            if npv.abs() < self.npv_tolerance {
                return Some(rate);
            }

            if dnpv.abs() < 1e-12 {
                // Derivative too small, let bisection take over
                return None;
            }

            let new_rate = rate - npv / dnpv;
            if !new_rate.is_finite() || new_rate <= self.lower_bound || new_rate > self.upper_bound {
                return None;
            }

            if (new_rate - rate).abs() < self.rate_tolerance {
                return Some(new_rate);
            }

            rate = new_rate;
        }

        None
    }

    fn bracket_search(&self, timed: &[(f64, f64)]) -> Result<f64> {
        let steps = ((self.upper_bound - self.lower_bound) / self.bracket_step).ceil() as usize;
        let grid: Vec<f64> = (0..=steps)
            .map(|i| (self.lower_bound + i as f64 * self.bracket_step).min(self.upper_bound))
            .collect();
        let values: Vec<f64> = grid.iter().map(|&r| npv_at(timed, r)).collect();

        // Sign-changing bracket closest to the seed
        let seed = self.initial_guess;
        let bracket = (0..grid.len() - 1)
            .filter(|&i| values[i] == 0.0 || values[i] * values[i + 1] < 0.0)
            .min_by(|&a, &b| {
                let dist = |i: usize| {
                    if seed < grid[i] {
                        grid[i] - seed
                    } else if seed > grid[i + 1] {
                        seed - grid[i + 1]
                    } else {
                        0.0
                    }
                };
                dist(a).total_cmp(&dist(b))
            });

        let Some(i) = bracket else {
            return Err(EngineError::NoConvergence {
                iterations: self.max_newton_iterations,
            });
        };
        if values[i] == 0.0 {
            return Ok(grid[i]);
        }

        let (mut low, mut high) = (grid[i], grid[i + 1]);
        let mut npv_low = values[i];

        for _ in 0..self.max_bisection_iterations {
            let mid = (low + high) / 2.0;
            let npv_mid = npv_at(timed, mid);

            if npv_mid.abs() < self.npv_tolerance || (high - low) / 2.0 < self.rate_tolerance {
                return Ok(mid);
            }

            if npv_mid * npv_low < 0.0 {
                high = mid;
            } else {
                low = mid;
                npv_low = npv_mid;
            }
        }

        Err(EngineError::NoConvergence {
            iterations: self.max_newton_iterations + self.max_bisection_iterations,
        })
    }
}

/// Validate a cashflow set and convert dates to year offsets from the earliest flow
fn time_offsets(flows: &[(NaiveDate, f64)]) -> Result<Vec<(f64, f64)>> {
    if flows.len() < 2 {
        return Err(EngineError::InvalidCashflowSet(format!(
            "need at least two cashflows, got {}",
            flows.len()
        )));
    }
    if flows.iter().any(|(_, amount)| !amount.is_finite()) {
        return Err(EngineError::InvalidCashflowSet("non-finite amount".to_string()));
    }

    let has_negative = flows.iter().any(|&(_, a)| a < 0.0);
    let has_non_negative = flows.iter().any(|&(_, a)| a >= 0.0);
    if !has_negative || !has_non_negative {
        return Err(EngineError::InvalidCashflowSet(
            "cashflows must include an outflow and an inflow".to_string(),
        ));
    }

    let first = flows.iter().map(|(d, _)| *d).min().unwrap_or(flows[0].0);
    Ok(flows
        .iter()
        .map(|&(date, amount)| (year_fraction(first, date), amount))
        .collect())
}

/// NPV and its derivative with respect to the annual rate
fn npv_and_derivative(timed: &[(f64, f64)], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;

    for &(t, cf) in timed {
        let discount = (1.0 + rate).powf(-t);
        npv += cf * discount;
        dnpv -= t * cf * discount / (1.0 + rate);
    }

    (npv, dnpv)
}

/// NPV of year-offset cashflows at an annual rate
pub fn npv_at(timed: &[(f64, f64)], rate: f64) -> f64 {
    timed.iter().map(|&(t, cf)| cf * (1.0 + rate).powf(-t)).sum()
}

/// XIRR over `(date, amount)` pairs with the default solver
pub fn xirr_dated(flows: &[(NaiveDate, f64)]) -> Result<f64> {
    XirrSolver::default().solve(flows)
}

/// XIRR over cashflow events with the default solver
pub fn xirr(events: &[CashflowEvent]) -> Result<f64> {
    let flows: Vec<(NaiveDate, f64)> = events.iter().map(|e| (e.date, e.amount)).collect();
    xirr_dated(&flows)
}

/// Annualized growth of a contribution schedule that ends at `terminal_value`
///
/// Contributions are the outflows in `contributions`; the terminal value is
/// added as a single inflow on `terminal_date`.
pub fn contribution_cagr(
    contributions: &[CashflowEvent],
    terminal_date: NaiveDate,
    terminal_value: f64,
) -> Result<f64> {
    let mut flows: Vec<(NaiveDate, f64)> = contributions
        .iter()
        .filter(|e| e.is_contribution())
        .map(|e| (e.date, e.amount))
        .collect();
    flows.push((terminal_date, terminal_value));
    xirr_dated(&flows)
}

/// Monthly rate equivalent to an annual rate, `(1 + r)^(1/12) - 1`
pub fn monthly_equivalent(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Annual rate equivalent to a rate compounded `periods_per_year` times a year
pub fn annualize_periodic(rate: f64, periods_per_year: f64) -> f64 {
    (1.0 + rate).powf(periods_per_year) - 1.0
}

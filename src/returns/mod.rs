//! Return measurement: XIRR solver and period statistics

mod period;
mod xirr;

pub use period::{modified_dietz, period_return, slice_range, summary_stats, PeriodReturn, PeriodSlice, SummaryStats};
pub use xirr::{annualize_periodic, contribution_cagr, monthly_equivalent, npv_at, xirr, xirr_dated, XirrSolver};

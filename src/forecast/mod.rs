//! Forward projection of contributions and position

mod assumptions;
mod engine;

pub use assumptions::{
    growth_rate_mid, ForecastAssumptions, ForecastMethod, ForecastRate, DEFAULT_UNCERTAINTY_BAND,
    GROWTH_RATE_FAST, GROWTH_RATE_SLOW, LOOKBACK_MONTHS,
};
pub use engine::{baseline_contribution, deflate_forecast, forecast, monthly_contribution_totals, ForecastPoint};

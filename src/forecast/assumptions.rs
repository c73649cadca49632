//! Forecast assumptions: horizon, contribution growth and expected return

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::benchmark::SimulationResult;
use crate::error::{EngineError, Result};
use crate::returns::contribution_cagr;
use crate::series::CashflowEvent;

/// Months of contribution history the baseline is estimated from
pub const LOOKBACK_MONTHS: usize = 12;

/// Default relative width of the forecast band
pub const DEFAULT_UNCERTAINTY_BAND: f64 = 0.10;

/// Real salary growth presets (career-plan progression above inflation)
pub const GROWTH_RATE_FAST: f64 = 0.0443; // 1.5 steps a year
pub const GROWTH_RATE_SLOW: f64 = GROWTH_RATE_FAST / 3.0; // 0.5 steps a year

/// Geometric mean of the fast and slow presets (~2.56%)
pub fn growth_rate_mid() -> f64 {
    (GROWTH_RATE_FAST * GROWTH_RATE_SLOW).sqrt()
}

/// How the starting monthly contribution `S0` is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForecastMethod {
    /// Mean of the recent monthly totals
    #[default]
    MeanOfRecentContributions,
    /// Least-squares trend over the recent monthly totals, one month ahead
    StatisticalExtrapolation,
}

/// Annual rate the projected position compounds at, tagged by where it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ForecastRate {
    /// The account's own XIRR
    Historical(f64),
    /// CAGR of a benchmark replay
    Benchmark(f64),
    Fixed(f64),
}

impl ForecastRate {
    /// Account XIRR from its contributions and latest position
    pub fn historical(contributions: &[CashflowEvent], last_date: NaiveDate, last_position: f64) -> Result<Self> {
        Ok(Self::Historical(contribution_cagr(contributions, last_date, last_position)?))
    }

    pub fn from_benchmark(result: &SimulationResult) -> Self {
        Self::Benchmark(result.cagr)
    }

    pub fn annual(&self) -> f64 {
        match *self {
            Self::Historical(rate) | Self::Benchmark(rate) | Self::Fixed(rate) => rate,
        }
    }

    /// Growth factor for one month
    pub fn monthly_factor(&self) -> f64 {
        (1.0 + self.annual()).powf(1.0 / 12.0)
    }
}

/// Parameters of one forecast run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAssumptions {
    pub horizon_months: u32,
    /// Continuous annual growth of the monthly contribution
    pub contribution_growth_rate: f64,
    pub method: ForecastMethod,
    pub rate: ForecastRate,
    /// Band reported around each projected position (0.10 = +/-10%)
    pub uncertainty_band: f64,
}

impl ForecastAssumptions {
    /// Forecast over `horizon_months` with flat contributions and the default band
    pub fn new(horizon_months: u32, rate: ForecastRate) -> Self {
        Self {
            horizon_months,
            contribution_growth_rate: 0.0,
            method: ForecastMethod::default(),
            rate,
            uncertainty_band: DEFAULT_UNCERTAINTY_BAND,
        }
    }

    /// Horizon given in whole years
    pub fn years(years: u32, rate: ForecastRate) -> Self {
        Self::new(years * 12, rate)
    }

    pub fn with_growth(mut self, contribution_growth_rate: f64) -> Self {
        self.contribution_growth_rate = contribution_growth_rate;
        self
    }

    pub fn with_method(mut self, method: ForecastMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_band(mut self, uncertainty_band: f64) -> Self {
        self.uncertainty_band = uncertainty_band;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.rate.annual();
        if !rate.is_finite() || rate <= -1.0 {
            return Err(EngineError::InvalidConfig(format!("forecast rate {} must be above -100%", rate)));
        }
        if !self.contribution_growth_rate.is_finite() {
            return Err(EngineError::InvalidConfig("contribution growth rate must be finite".to_string()));
        }
        if !(0.0..1.0).contains(&self.uncertainty_band) {
            return Err(EngineError::InvalidConfig(format!(
                "uncertainty band {} must be in [0, 1)",
                self.uncertainty_band
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_growth_presets() {
        assert_relative_eq!(GROWTH_RATE_SLOW, 0.014767, epsilon = 1e-5);
        assert_relative_eq!(growth_rate_mid(), 0.025576, epsilon = 1e-5);
        assert!(GROWTH_RATE_SLOW < growth_rate_mid() && growth_rate_mid() < GROWTH_RATE_FAST);
    }

    #[test]
    fn test_monthly_factor_compounds_to_annual() {
        let rate = ForecastRate::Fixed(0.12);
        assert_relative_eq!(rate.monthly_factor().powi(12), 1.12, epsilon = 1e-12);
    }

    #[test]
    fn test_defaults_and_builders() {
        let a = ForecastAssumptions::years(5, ForecastRate::Fixed(0.08));
        assert_eq!(a.horizon_months, 60);
        assert_eq!(a.method, ForecastMethod::MeanOfRecentContributions);
        assert_relative_eq!(a.uncertainty_band, 0.10);
        assert!(a.validate().is_ok());

        let b = a.with_growth(GROWTH_RATE_FAST).with_band(0.2);
        assert_relative_eq!(b.contribution_growth_rate, GROWTH_RATE_FAST);
        assert_relative_eq!(b.uncertainty_band, 0.2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ForecastAssumptions::new(12, ForecastRate::Fixed(-1.0)).validate().is_err());
        assert!(ForecastAssumptions::new(12, ForecastRate::Fixed(0.05)).with_band(1.5).validate().is_err());
        assert!(ForecastAssumptions::new(12, ForecastRate::Fixed(f64::NAN)).validate().is_err());
    }
}

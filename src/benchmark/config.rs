//! Benchmark simulation settings
//!
//! Supports:
//! - Overhead drag (or boost) on the benchmark index
//! - Company-matching contributions scaled by a match ratio
//! - Participant-only replays ("company money as mine")

use serde::{Deserialize, Serialize};

use crate::daycount::months_between;
use crate::error::{EngineError, Result};
use crate::series::{CashflowEvent, IndexSeries};

/// Settings for one benchmark replay, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Annual cost rate taken out of the benchmark (0.01 = 1% a year)
    /// Negative values add performance instead, e.g. "IPCA + 4%"
    pub overhead_annual_rate: f64,

    /// Multiplier applied to sponsor contributions
    pub company_match_ratio: f64,

    /// Whether sponsor contributions are replayed at all
    pub include_company_contribution: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            overhead_annual_rate: 0.0,
            company_match_ratio: 1.0,
            include_company_contribution: true,
        }
    }
}

impl SimulationConfig {
    /// Replay only the participant's own contributions
    pub fn participant_only() -> Self {
        Self {
            include_company_contribution: false,
            ..Self::default()
        }
    }

    /// Same settings with a different overhead rate
    pub fn with_overhead(mut self, overhead_annual_rate: f64) -> Self {
        self.overhead_annual_rate = overhead_annual_rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.overhead_annual_rate.is_finite() || self.overhead_annual_rate <= -1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "overhead rate {} must be finite and above -100%",
                self.overhead_annual_rate
            )));
        }
        if !self.company_match_ratio.is_finite() || self.company_match_ratio < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "company match ratio {} must be non-negative",
                self.company_match_ratio
            )));
        }
        Ok(())
    }

    /// Monthly multiplicative factor equivalent to the annual overhead
    pub fn monthly_drag_factor(&self) -> f64 {
        (1.0 + self.overhead_annual_rate).powf(-1.0 / 12.0)
    }

    /// Cumulative drag after `months` months of compounding
    pub fn drag_after_months(&self, months: f64) -> f64 {
        self.monthly_drag_factor().powf(months)
    }

    /// Benchmark index net of overhead, compounded monthly from the index start
    pub fn apply_overhead(&self, index: &IndexSeries) -> Result<IndexSeries> {
        if self.overhead_annual_rate == 0.0 {
            return Ok(index.clone());
        }
        let start = index.first_date();
        let name = format!("{} {:+.2}%", index.name(), -self.overhead_annual_rate * 100.0);
        index.map_values(name, |date, value| value * self.drag_after_months(months_between(start, date)))
    }

    /// Contributions to replay, as negative-amount events sorted by date
    ///
    /// Sponsor contributions are dropped when company money is excluded and
    /// scaled by the match ratio otherwise. Inflows are not contributions
    /// and never replayed.
    pub fn fold_contributions(&self, events: &[CashflowEvent]) -> Vec<CashflowEvent> {
        let mut folded: Vec<CashflowEvent> = events
            .iter()
            .filter(|e| e.is_contribution())
            .filter_map(|e| {
                if !e.category.is_sponsor() {
                    Some(*e)
                } else if self.include_company_contribution {
                    Some(CashflowEvent::new(e.date, e.amount * self.company_match_ratio, e.category))
                } else {
                    None
                }
            })
            .collect();
        folded.sort_by_key(|e| e.date);
        folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Category;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn events() -> Vec<CashflowEvent> {
        vec![
            CashflowEvent::contribution(d(2024, 2, 5), 500.0, Category::Participant),
            CashflowEvent::contribution(d(2024, 1, 5), 500.0, Category::Participant),
            CashflowEvent::contribution(d(2024, 1, 5), 400.0, Category::Sponsor),
            CashflowEvent::valuation(d(2024, 3, 1), 2000.0),
        ]
    }

    #[test]
    fn test_fold_includes_scaled_sponsor() {
        let config = SimulationConfig {
            company_match_ratio: 0.5,
            ..SimulationConfig::default()
        };
        let folded = config.fold_contributions(&events());
        assert_eq!(folded.len(), 3);
        assert_eq!(folded[0].date, d(2024, 1, 5));
        let total: f64 = folded.iter().map(|e| e.contributed()).sum();
        assert_relative_eq!(total, 1200.0);
    }

    #[test]
    fn test_fold_participant_only() {
        let folded = SimulationConfig::participant_only().fold_contributions(&events());
        assert_eq!(folded.len(), 2);
        assert!(folded.iter().all(|e| e.category == Category::Participant));
    }

    #[test]
    fn test_monthly_drag_compounds_to_annual() {
        let config = SimulationConfig::default().with_overhead(0.02);
        assert_relative_eq!(config.drag_after_months(12.0), 1.0 / 1.02, epsilon = 1e-12);
        assert_relative_eq!(config.drag_after_months(0.0), 1.0);
    }

    #[test]
    fn test_zero_overhead_leaves_index_unchanged() {
        let idx = IndexSeries::new("cdi", vec![(d(2024, 1, 1), 1.0), (d(2024, 6, 1), 1.05)]).unwrap();
        let adjusted = SimulationConfig::default().apply_overhead(&idx).unwrap();
        assert_eq!(adjusted, idx);
    }

    #[test]
    fn test_overhead_direction() {
        let idx = IndexSeries::new("cdi", vec![(d(2024, 1, 1), 1.0), (d(2025, 1, 1), 1.10)]).unwrap();

        let drag = SimulationConfig::default().with_overhead(0.02).apply_overhead(&idx).unwrap();
        assert_relative_eq!(drag.value_at(d(2024, 1, 1)), 1.0);
        assert!(drag.value_at(d(2025, 1, 1)) < 1.10);

        let boost = SimulationConfig::default().with_overhead(-0.04).apply_overhead(&idx).unwrap();
        assert!(boost.value_at(d(2025, 1, 1)) > 1.10);
    }

    #[test]
    fn test_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig::default().with_overhead(-1.0).validate().is_err());
        let bad_ratio = SimulationConfig {
            company_match_ratio: -0.5,
            ..SimulationConfig::default()
        };
        assert!(bad_ratio.validate().is_err());
    }
}

//! Account analyzer for running many analyses over one reconciled history
//!
//! Holds the stitched snapshots and cashflows once, then answers summary,
//! benchmark, deflation and forecast questions without re-reading input.

use chrono::NaiveDate;
use log::warn;

use crate::benchmark::{simulate, valuation_dates_for, SimulationConfig, SimulationResult};
use crate::error::{EngineError, Result};
use crate::forecast::{forecast, ForecastAssumptions, ForecastPoint, ForecastRate};
use crate::inflation::{apply_deflation, DeflationSettings};
use crate::reconcile::{reconcile, PartialHistory, Partition, PartitionMismatch, ReconcileConfig};
use crate::returns::{period_return, summary_stats, PeriodReturn, SummaryStats};
use crate::series::{is_strictly_ordered, CashflowEvent, IndexSeries, PositionSnapshot};

/// One account's canonical history
///
/// # Example
/// ```ignore
/// let (account, warnings) = AccountAnalyzer::from_partitions(&partitions, cashflows, &ReconcileConfig::default())?;
///
/// for index in [&cdi, &ipca] {
///     let result = account.benchmark(index, &SimulationConfig::default())?;
///     println!("{}: {:.2}", result.name, result.final_position);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AccountAnalyzer {
    snapshots: Vec<PositionSnapshot>,
    cashflows: Vec<CashflowEvent>,
    partial: Option<PartialHistory>,
}

impl AccountAnalyzer {
    /// Build from an already reconciled series; cashflows are sorted by date
    pub fn new(snapshots: Vec<PositionSnapshot>, mut cashflows: Vec<CashflowEvent>) -> Result<Self> {
        if snapshots.is_empty() {
            return Err(EngineError::InvalidSeries("account has no snapshots".to_string()));
        }
        if !is_strictly_ordered(&snapshots) {
            return Err(EngineError::InvalidSeries(
                "snapshot dates must be strictly increasing".to_string(),
            ));
        }
        cashflows.sort_by_key(|c| c.date);
        Ok(Self {
            snapshots,
            cashflows,
            partial: None,
        })
    }

    /// Reconcile `partitions` and build from the stitched series
    ///
    /// Boundary mismatches are returned alongside the analyzer; callers that
    /// want them fatal use [`crate::reconcile::Reconciled::into_strict`] directly.
    pub fn from_partitions(
        partitions: &[Partition],
        cashflows: Vec<CashflowEvent>,
        config: &ReconcileConfig,
    ) -> Result<(Self, Vec<PartitionMismatch>)> {
        let reconciled = reconcile(partitions, config);
        if reconciled.has_warnings() {
            warn!("Reconciled history has {} mismatches", reconciled.warnings.len());
        }
        let analyzer = Self::new(reconciled.snapshots, cashflows)?;
        Ok((analyzer, reconciled.warnings))
    }

    /// Same history with quotas bought before the first extract added back in
    pub fn with_partial_history(mut self, partial: PartialHistory) -> Self {
        self.snapshots = partial.apply(&self.snapshots);
        self.partial = Some(partial);
        self
    }

    pub fn snapshots(&self) -> &[PositionSnapshot] {
        &self.snapshots
    }

    pub fn cashflows(&self) -> &[CashflowEvent] {
        &self.cashflows
    }

    pub fn partial(&self) -> Option<&PartialHistory> {
        self.partial.as_ref()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.snapshots[0].date
    }

    pub fn last_snapshot(&self) -> &PositionSnapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Headline figures over the whole history
    ///
    /// With a partial history the hidden starting position counts as an
    /// opening contribution at the first snapshot date.
    pub fn summary(&self) -> Result<SummaryStats> {
        summary_stats(&self.snapshots, &self.effective_cashflows())
    }

    /// Returns for `[start, end]`, excluding quotas held before the range
    pub fn period(&self, start: NaiveDate, end: NaiveDate) -> Result<PeriodReturn> {
        let missing = self.partial.map(|p| p.missing_quotas).unwrap_or(0.0);
        period_return(&self.snapshots, &self.cashflows, start, end, missing)
    }

    /// Replay this account's contributions into `index`, valued on its snapshot dates
    pub fn benchmark(&self, index: &IndexSeries, config: &SimulationConfig) -> Result<SimulationResult> {
        let cashflows = self.effective_cashflows();
        let dates = valuation_dates_for(&self.snapshots, &cashflows);
        simulate(&cashflows, index, &dates, config)
    }

    /// Replay into several benchmarks with the same settings
    pub fn benchmarks(&self, indices: &[IndexSeries], config: &SimulationConfig) -> Vec<Result<SimulationResult>> {
        indices.iter().map(|index| self.benchmark(index, config)).collect()
    }

    /// Same account in reference-date money, or an unchanged copy when disabled
    ///
    /// The hidden quotas of a partial history are repriced too, so the opening
    /// contribution is in the same money as everything else.
    pub fn deflated(&self, inflation: &IndexSeries, settings: &DeflationSettings) -> Self {
        let (snapshots, cashflows) = apply_deflation(&self.snapshots, &self.cashflows, inflation, settings);
        let partial = match (self.partial, settings.deflator(inflation)) {
            (Some(partial), Some(deflator)) => Some(PartialHistory {
                first_unit_value: deflator.deflate(partial.first_unit_value, self.first_date()),
                ..partial
            }),
            (partial, _) => partial,
        };
        Self {
            snapshots,
            cashflows,
            partial,
        }
    }

    /// The account's own annualized return, as a forecast rate
    pub fn historical_rate(&self) -> Result<ForecastRate> {
        let last = self.last_snapshot();
        ForecastRate::historical(&self.effective_cashflows(), last.date, last.position)
    }

    /// Project past the last snapshot using contributions folded by `config`
    pub fn forecast(&self, assumptions: &ForecastAssumptions, config: &SimulationConfig) -> Result<Vec<ForecastPoint>> {
        let folded = config.fold_contributions(&self.cashflows);
        forecast(&self.snapshots, &folded, assumptions)
    }

    fn effective_cashflows(&self) -> Vec<CashflowEvent> {
        let mut cashflows = Vec::with_capacity(self.cashflows.len() + 1);
        if let Some(partial) = &self.partial {
            cashflows.push(partial.opening_contribution(self.first_date()));
        }
        cashflows.extend_from_slice(&self.cashflows);
        cashflows
    }
}

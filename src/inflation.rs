//! Inflation deflator: rebase nominal values to a reference date's purchasing power
//!
//! `real(d) = nominal(d) * I(ref) / I(d)`. Dates without an index observation
//! use the value in force on that date (see [`IndexSeries::lookup`]); there is
//! no interpolation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::{CashflowEvent, IndexSeries, PositionSnapshot};

/// Whether and to which date values are deflated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeflationSettings {
    pub enabled: bool,
    pub reference_date: NaiveDate,
}

impl DeflationSettings {
    pub fn enabled_at(reference_date: NaiveDate) -> Self {
        Self {
            enabled: true,
            reference_date,
        }
    }

    pub fn disabled(reference_date: NaiveDate) -> Self {
        Self {
            enabled: false,
            reference_date,
        }
    }

    /// Deflator for `index`, or `None` when deflation is switched off
    pub fn deflator<'a>(&self, index: &'a IndexSeries) -> Option<Deflator<'a>> {
        self.enabled.then(|| Deflator::new(index, self.reference_date))
    }
}

/// Deflates values against one inflation index and reference date
#[derive(Debug, Clone, Copy)]
pub struct Deflator<'a> {
    index: &'a IndexSeries,
    reference_date: NaiveDate,
    reference_value: f64,
}

impl<'a> Deflator<'a> {
    pub fn new(index: &'a IndexSeries, reference_date: NaiveDate) -> Self {
        Self {
            index,
            reference_date,
            reference_value: index.value_at(reference_date),
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Multiplier taking a value at `date` to reference-date money
    pub fn factor(&self, date: NaiveDate) -> f64 {
        self.reference_value / self.index.value_at(date)
    }

    pub fn deflate(&self, value: f64, date: NaiveDate) -> f64 {
        value * self.factor(date)
    }

    /// Rebase points already expressed in this deflator's reference money to `new_reference`
    pub fn rebase_points(&self, points: &[(NaiveDate, f64)], new_reference: NaiveDate) -> Vec<(NaiveDate, f64)> {
        let factor = self.index.value_at(new_reference) / self.reference_value;
        points.iter().map(|&(date, value)| (date, value * factor)).collect()
    }

    pub fn deflate_points(&self, points: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
        points.iter().map(|&(date, value)| (date, self.deflate(value, date))).collect()
    }

    /// Deflate unit value and position; the quota count is a quantity and stays put
    pub fn deflate_snapshots(&self, snapshots: &[PositionSnapshot]) -> Vec<PositionSnapshot> {
        snapshots
            .iter()
            .map(|s| {
                let factor = self.factor(s.date);
                PositionSnapshot {
                    date: s.date,
                    quota_count: s.quota_count,
                    unit_value: s.unit_value * factor,
                    position: s.position * factor,
                }
            })
            .collect()
    }

    pub fn deflate_cashflows(&self, events: &[CashflowEvent]) -> Vec<CashflowEvent> {
        events
            .iter()
            .map(|e| CashflowEvent::new(e.date, self.deflate(e.amount, e.date), e.category))
            .collect()
    }
}

/// One-off deflation of a single value
pub fn deflate_value(value: f64, date: NaiveDate, index: &IndexSeries, reference_date: NaiveDate) -> f64 {
    Deflator::new(index, reference_date).deflate(value, date)
}

/// Deflate an account's snapshots and cashflows, or return them unchanged when disabled
pub fn apply_deflation(
    snapshots: &[PositionSnapshot],
    cashflows: &[CashflowEvent],
    index: &IndexSeries,
    settings: &DeflationSettings,
) -> (Vec<PositionSnapshot>, Vec<CashflowEvent>) {
    match settings.deflator(index) {
        Some(deflator) => (deflator.deflate_snapshots(snapshots), deflator.deflate_cashflows(cashflows)),
        None => (snapshots.to_vec(), cashflows.to_vec()),
    }
}

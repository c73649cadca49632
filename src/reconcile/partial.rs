//! Extracts that start after the account was opened
//!
//! A statement's closing balance can report more quotas than its listed
//! movements add up to. The difference was bought before the extract begins
//! and is valued at the first unit price the extract shows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::{CashflowEvent, Category, PositionSnapshot};

/// Missing quotas above this count mark an extract as partial
pub const PARTIAL_THRESHOLD: f64 = 0.1;

/// Quotas held before the first movement of an extract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialHistory {
    pub missing_quotas: f64,
    /// First unit value the extract shows; used for every missing month
    pub first_unit_value: f64,
}

impl PartialHistory {
    /// Compare the reported closing quota total with the quotas the movements add up to
    pub fn detect(reported_total_quotas: f64, visible_quotas: f64, first_unit_value: f64) -> Option<Self> {
        let missing_quotas = reported_total_quotas - visible_quotas;
        if missing_quotas > PARTIAL_THRESHOLD {
            Some(Self {
                missing_quotas,
                first_unit_value,
            })
        } else {
            None
        }
    }

    /// Value of the missing quotas at the first known unit price
    pub fn starting_position(&self) -> f64 {
        self.missing_quotas * self.first_unit_value
    }

    /// Add the missing quotas to every snapshot
    pub fn apply(&self, snapshots: &[PositionSnapshot]) -> Vec<PositionSnapshot> {
        snapshots.iter().map(|s| s.with_extra_quotas(self.missing_quotas)).collect()
    }

    /// Snapshots for months the extract does not cover, all at the first known unit value
    pub fn backfill(&self, dates: &[NaiveDate]) -> Vec<PositionSnapshot> {
        dates
            .iter()
            .map(|&date| PositionSnapshot::new(date, self.missing_quotas, self.first_unit_value))
            .collect()
    }

    /// Position error of a back-filled month whose true unit value was `true_unit_value`
    ///
    /// The fill price never changes, so the error is a fixed offset against a
    /// fixed historical price rather than a drift that grows month by month.
    pub fn fill_error(&self, true_unit_value: f64) -> f64 {
        self.missing_quotas * (self.first_unit_value - true_unit_value)
    }

    /// Starting position as an opening contribution, for benchmark replays
    pub fn opening_contribution(&self, date: NaiveDate) -> CashflowEvent {
        CashflowEvent::contribution(date, self.starting_position(), Category::Participant)
    }
}

//! Typed account records handed over by the extraction side

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Relative tolerance for `position == quota_count * unit_value`
pub const POSITION_TOLERANCE: f64 = 1e-6;

/// Who paid a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Paid by the account holder
    Participant,
    /// Paid by the employer (matching contribution)
    Sponsor,
}

impl Category {
    pub fn is_sponsor(&self) -> bool {
        matches!(self, Category::Sponsor)
    }
}

/// A dated, signed cashflow
///
/// Negative amounts are contributions (money leaving the holder), positive
/// amounts are terminal valuations or withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashflowEvent {
    pub date: NaiveDate,
    pub amount: f64,
    pub category: Category,
}

impl CashflowEvent {
    pub fn new(date: NaiveDate, amount: f64, category: Category) -> Self {
        Self { date, amount, category }
    }

    /// Contribution of `amount` (stored negative)
    pub fn contribution(date: NaiveDate, amount: f64, category: Category) -> Self {
        Self::new(date, -amount.abs(), category)
    }

    /// Terminal valuation inflow of `amount` (stored positive)
    pub fn valuation(date: NaiveDate, amount: f64) -> Self {
        Self::new(date, amount.abs(), Category::Participant)
    }

    pub fn is_contribution(&self) -> bool {
        self.amount < 0.0
    }

    /// Contributed amount as a positive number (0 for inflows)
    pub fn contributed(&self) -> f64 {
        if self.is_contribution() {
            -self.amount
        } else {
            0.0
        }
    }
}

/// Account position at a valuation date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    /// Number of fund units (cotas) held
    pub quota_count: f64,
    /// Price of one unit at `date`
    pub unit_value: f64,
    /// Monetary position
    pub position: f64,
}

impl PositionSnapshot {
    /// Build a snapshot, deriving the position from quotas and unit value
    pub fn new(date: NaiveDate, quota_count: f64, unit_value: f64) -> Self {
        Self {
            date,
            quota_count,
            unit_value,
            position: quota_count * unit_value,
        }
    }

    /// Relative gap between the stored position and `quota_count * unit_value`
    pub fn decoupling(&self) -> f64 {
        let implied = self.quota_count * self.unit_value;
        let scale = implied.abs().max(self.position.abs());
        if scale < 1e-12 {
            0.0
        } else {
            (self.position - implied).abs() / scale
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.decoupling() <= POSITION_TOLERANCE
    }

    /// Copy holding `extra` more quotas, valued at this snapshot's unit value
    ///
    /// The position moves by `extra * unit_value`, so any decoupling in the
    /// reported position is carried over rather than recomputed away.
    pub fn with_extra_quotas(&self, extra: f64) -> Self {
        Self {
            quota_count: self.quota_count + extra,
            position: self.position + extra * self.unit_value,
            ..*self
        }
    }
}

/// Whether snapshot dates are strictly increasing
pub fn is_strictly_ordered(snapshots: &[PositionSnapshot]) -> bool {
    snapshots.windows(2).all(|w| w[0].date < w[1].date)
}

//! Error types shared by every engine component

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the calculation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Return solver could not bracket or converge on a rate
    #[error("rate solver did not converge after {iterations} iterations")]
    NoConvergence { iterations: u32 },

    /// Requested dates fall outside the index series coverage
    #[error(
        "index data unavailable for {requested_start}..{requested_end} \
         (series covers {available_start}..{available_end})"
    )]
    IndexUnavailable {
        requested_start: NaiveDate,
        requested_end: NaiveDate,
        available_start: NaiveDate,
        available_end: NaiveDate,
    },

    /// Boundary discontinuity between stitched partitions exceeds tolerance
    #[error(
        "partition mismatch at {boundary}: relative gap {relative_gap:.4} exceeds tolerance {tolerance:.4}"
    )]
    PartitionMismatch {
        boundary: NaiveDate,
        relative_gap: f64,
        tolerance: f64,
    },

    /// Fewer than two cashflows, or no sign change
    #[error("invalid cashflow set: {0}")]
    InvalidCashflowSet(String),

    /// Index or position series failed validation
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    /// Simulation or forecast settings out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

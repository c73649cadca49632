//! Pension Analyzer - return, benchmark and forecast engine for unit-price pension accounts
//!
//! This library provides:
//! - XIRR returns on a 252-business-day convention
//! - Reconciliation of overlapping historical extracts into one series
//! - Benchmark replays with overhead drag and company-match folding
//! - Inflation deflation to a reference date
//! - Monthly forecasts of contributions and position

pub mod daycount;
pub mod error;
pub mod series;
pub mod returns;
pub mod reconcile;
pub mod benchmark;
pub mod inflation;
pub mod forecast;
pub mod analyzer;

// Re-export commonly used types
pub use analyzer::AccountAnalyzer;
pub use benchmark::{simulate, SimulationConfig, SimulationResult};
pub use error::{EngineError, Result};
pub use forecast::{forecast, ForecastAssumptions, ForecastMethod, ForecastPoint, ForecastRate};
pub use inflation::{DeflationSettings, Deflator};
pub use reconcile::{reconcile, Partition, ReconcileConfig, Reconciled};
pub use returns::{xirr, XirrSolver};
pub use series::{CashflowEvent, Category, IndexSeries, PositionSnapshot};

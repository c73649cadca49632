//! Benchmark replay: what the contributions would be worth in another index
//!
//! # Example
//!
//! ```rust,ignore
//! use pension_analyzer::benchmark::{simulate, valuation_dates_for, SimulationConfig};
//!
//! let config = SimulationConfig::participant_only().with_overhead(0.005);
//! let dates = valuation_dates_for(&snapshots, &cashflows);
//! let cdi = simulate(&cashflows, &cdi_index, &dates, &config)?;
//! println!("CDI: {:.2} ({:.2}% a.a.)", cdi.final_position, cdi.cagr * 100.0);
//! ```

mod config;
mod simulator;

pub use config::SimulationConfig;
pub use simulator::{simulate, valuation_dates_for, SimulationResult};

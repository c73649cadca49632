//! Typed records and index series shared by every engine component

mod records;
mod index;
pub mod loader;

pub use records::{CashflowEvent, Category, PositionSnapshot, POSITION_TOLERANCE, is_strictly_ordered};
pub use index::IndexSeries;
pub use loader::{load_cashflows, load_index, load_snapshots};

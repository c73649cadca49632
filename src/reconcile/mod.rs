//! Reconciliation of historical extracts into one canonical position series

mod partition;
mod partial;

pub use partition::{
    reconcile, Boundary, Partition, PartitionMismatch, ReconcileConfig, Reconciled,
    DEFAULT_BOUNDARY_TOLERANCE,
};
pub use partial::{PartialHistory, PARTIAL_THRESHOLD};

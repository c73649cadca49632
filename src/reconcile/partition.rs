//! Stitch adjacent statement extracts into one continuous position series

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::series::PositionSnapshot;

/// Default boundary tolerance: typical month-over-month unit growth is 1-2%
pub const DEFAULT_BOUNDARY_TOLERANCE: f64 = 0.03;

/// One self-consistent extract covering a sub-range of the history
///
/// Quota counts are local to the extract: they accumulate only the
/// movements that the extract itself shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub label: String,
    pub snapshots: Vec<PositionSnapshot>,
}

impl Partition {
    pub fn new(label: impl Into<String>, mut snapshots: Vec<PositionSnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.date);
        Self {
            label: label.into(),
            snapshots,
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.date)
    }
}

/// Reconciliation settings
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Relative unit-price jump tolerated at a partition boundary
    pub boundary_tolerance: f64,
    /// Relative tolerance for a snapshot's position vs quotas x unit value
    pub snapshot_tolerance: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE,
            snapshot_tolerance: DEFAULT_BOUNDARY_TOLERANCE,
        }
    }
}

/// What happened where two partitions meet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boundary {
    /// Last date of the earlier partition
    pub previous_date: NaiveDate,
    /// First date of the later partition
    pub next_date: NaiveDate,
    /// Quotas carried across the boundary
    pub carried_quotas: f64,
    pub previous_unit_value: f64,
    pub next_unit_value: f64,
}

impl Boundary {
    /// Position change caused by the unobservable unit-price move, `q * (u_b - u_a)`
    pub fn discontinuity(&self) -> f64 {
        self.carried_quotas * (self.next_unit_value - self.previous_unit_value)
    }

    /// Relative unit-price change across the boundary
    pub fn relative_gap(&self) -> f64 {
        if self.previous_unit_value.abs() < 1e-12 {
            0.0
        } else {
            (self.next_unit_value - self.previous_unit_value) / self.previous_unit_value
        }
    }
}

/// A boundary or snapshot outside tolerance; reported, never corrected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionMismatch {
    pub date: NaiveDate,
    pub relative_gap: f64,
    pub tolerance: f64,
}

impl From<&PartitionMismatch> for EngineError {
    fn from(m: &PartitionMismatch) -> Self {
        EngineError::PartitionMismatch {
            boundary: m.date,
            relative_gap: m.relative_gap,
            tolerance: m.tolerance,
        }
    }
}

/// Best-effort stitched series plus anything that did not line up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reconciled {
    pub snapshots: Vec<PositionSnapshot>,
    pub boundaries: Vec<Boundary>,
    pub warnings: Vec<PartitionMismatch>,
}

impl Reconciled {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Treat the first mismatch as fatal
    pub fn into_strict(self) -> Result<Vec<PositionSnapshot>, EngineError> {
        match self.warnings.first() {
            Some(mismatch) => Err(mismatch.into()),
            None => Ok(self.snapshots),
        }
    }
}

/// Merge partitions into one series with strictly increasing dates
///
/// Quota counts are carried forward additively across boundaries. The unit
/// price at the end of one partition cannot be observed from the next one,
/// so positions are not forced to match at the boundary; a jump larger than
/// the tolerance is reported as a [`PartitionMismatch`].
///
/// A reported position that disagrees with quotas x unit value is warned about
/// and kept as reported, shifted by the value of the carried quotas.
pub fn reconcile(partitions: &[Partition], config: &ReconcileConfig) -> Reconciled {
    let mut ordered: Vec<&Partition> = partitions.iter().filter(|p| !p.snapshots.is_empty()).collect();
    ordered.sort_by_key(|p| p.first_date());

    let mut result = Reconciled::default();

    for partition in ordered {
        let offset = result.snapshots.last().map(|s| s.quota_count).unwrap_or(0.0);
        let previous = result.snapshots.last().copied();

        let mut first_in_partition = true;
        for snap in &partition.snapshots {
            if let Some(last) = result.snapshots.last() {
                if snap.date <= last.date {
                    warn!(
                        "Dropping snapshot {} from '{}': overlaps stitched series ending {}",
                        snap.date, partition.label, last.date
                    );
                    continue;
                }
            }

            if snap.decoupling() > config.snapshot_tolerance {
                warn!(
                    "Snapshot {} in '{}' has position decoupled from quotas x unit value by {:.4}",
                    snap.date,
                    partition.label,
                    snap.decoupling()
                );
                result.warnings.push(PartitionMismatch {
                    date: snap.date,
                    relative_gap: snap.decoupling(),
                    tolerance: config.snapshot_tolerance,
                });
            }

            if first_in_partition {
                if let Some(prev) = previous {
                    let boundary = Boundary {
                        previous_date: prev.date,
                        next_date: snap.date,
                        carried_quotas: offset,
                        previous_unit_value: prev.unit_value,
                        next_unit_value: snap.unit_value,
                    };
                    if boundary.relative_gap().abs() > config.boundary_tolerance {
                        warn!(
                            "Partition '{}' starts {} with unit value gap {:.4} (tolerance {:.4})",
                            partition.label,
                            snap.date,
                            boundary.relative_gap(),
                            config.boundary_tolerance
                        );
                        result.warnings.push(PartitionMismatch {
                            date: snap.date,
                            relative_gap: boundary.relative_gap(),
                            tolerance: config.boundary_tolerance,
                        });
                    }
                    result.boundaries.push(boundary);
                }
                first_in_partition = false;
            }

            result.snapshots.push(snap.with_extra_quotas(offset));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month_end(y: i32, m: u32) -> NaiveDate {
        let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
        d(ny, nm, 1).pred_opt().unwrap()
    }

    /// Partition buying 10 quotas a month at a unit value growing 1% monthly
    fn partition(label: &str, year: i32, months: std::ops::RangeInclusive<u32>, start_unit: f64) -> Partition {
        let mut quotas = 0.0;
        let mut unit = start_unit;
        let snaps = months
            .map(|m| {
                quotas += 10.0;
                let s = PositionSnapshot::new(month_end(year, m), quotas, unit);
                unit *= 1.01;
                s
            })
            .collect();
        Partition::new(label, snaps)
    }

    #[test]
    fn test_matching_boundary_has_zero_discontinuity() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let last_unit = a.snapshots.last().unwrap().unit_value;
        let b = partition("b", 2023, 7..=12, last_unit);

        let merged = reconcile(&[b, a], &ReconcileConfig::default());
        assert_eq!(merged.snapshots.len(), 12);
        assert_eq!(merged.boundaries.len(), 1);
        assert_eq!(merged.boundaries[0].discontinuity(), 0.0);
        assert!(!merged.has_warnings());
    }

    #[test]
    fn test_quotas_carried_additively() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let b = partition("b", 2023, 7..=12, 1.07);
        let merged = reconcile(&[a, b], &ReconcileConfig::default());

        assert_relative_eq!(merged.snapshots[5].quota_count, 60.0);
        assert_relative_eq!(merged.snapshots[6].quota_count, 70.0);
        assert_relative_eq!(merged.snapshots[11].quota_count, 120.0);
        assert!(merged.snapshots.iter().all(|s| s.is_consistent()));
        assert!(crate::series::is_strictly_ordered(&merged.snapshots));
    }

    #[test]
    fn test_boundary_delta_tracks_unit_change() {
        for &pct in &[0.01, 0.02, 0.029] {
            let a = partition("a", 2023, 1..=6, 1.0);
            let last = *a.snapshots.last().unwrap();
            let b = partition("b", 2023, 7..=12, last.unit_value * (1.0 + pct));
            let merged = reconcile(&[a, b], &ReconcileConfig::default());

            let boundary = &merged.boundaries[0];
            let expected = last.quota_count * last.unit_value * pct;
            assert_relative_eq!(boundary.discontinuity(), expected, max_relative = 1e-9);
            assert!(boundary.relative_gap().abs() <= DEFAULT_BOUNDARY_TOLERANCE);
            assert!(!merged.has_warnings());
        }
    }

    #[test]
    fn test_large_boundary_gap_is_warning_not_error() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let b = partition("b", 2023, 7..=12, 1.20);
        let merged = reconcile(&[a, b], &ReconcileConfig::default());

        assert_eq!(merged.snapshots.len(), 12);
        assert_eq!(merged.warnings.len(), 1);
        assert_eq!(merged.warnings[0].date, month_end(2023, 7));

        let err = merged.into_strict().unwrap_err();
        assert!(matches!(err, EngineError::PartitionMismatch { .. }));
    }

    #[test]
    fn test_overlapping_snapshots_dropped() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let b = partition("b", 2023, 5..=9, 1.05);
        let merged = reconcile(&[a, b], &ReconcileConfig::default());

        assert_eq!(merged.snapshots.len(), 9);
        assert!(crate::series::is_strictly_ordered(&merged.snapshots));
        assert_eq!(merged.boundaries[0].next_date, month_end(2023, 7));
    }

    #[test]
    fn test_decoupled_snapshot_reported() {
        let mut a = partition("a", 2023, 1..=3, 1.0);
        a.snapshots[1].position *= 1.10;
        let merged = reconcile(&[a], &ReconcileConfig::default());
        assert_eq!(merged.warnings.len(), 1);
        assert_eq!(merged.warnings[0].date, month_end(2023, 2));
        assert!(!merged.snapshots[1].is_consistent());
        assert_relative_eq!(merged.snapshots[1].position, 20.0 * 1.01 * 1.10, max_relative = 1e-12);
    }

    #[test]
    fn test_decoupled_position_shifted_by_carried_quotas() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let last_unit = a.snapshots.last().unwrap().unit_value;
        let mut b = partition("b", 2023, 7..=9, last_unit);
        let reported = b.snapshots[1].position + 5.0;
        b.snapshots[1].position = reported;

        let merged = reconcile(&[a, b], &ReconcileConfig::default());
        let stitched = merged.snapshots[7];
        assert_relative_eq!(stitched.quota_count, 80.0);
        assert_relative_eq!(stitched.position, reported + 60.0 * stitched.unit_value, max_relative = 1e-12);
        assert_eq!(merged.warnings.len(), 1);
    }

    #[test]
    fn test_dropped_overlap_not_reported_as_decoupled() {
        let a = partition("a", 2023, 1..=6, 1.0);
        let mut b = partition("b", 2023, 5..=9, 1.0406);
        // Dated inside the first extract, so it is dropped
        b.snapshots[0].position *= 1.50;
        let merged = reconcile(&[a, b], &ReconcileConfig::default());

        assert_eq!(merged.snapshots.len(), 9);
        assert!(merged.warnings.iter().all(|w| w.date > month_end(2023, 6)));
        assert!(!merged.has_warnings());
    }

    #[test]
    fn test_empty_input() {
        let merged = reconcile(&[], &ReconcileConfig::default());
        assert!(merged.snapshots.is_empty());
        assert!(merged.into_strict().unwrap().is_empty());
    }
}

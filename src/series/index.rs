//! Dated index series (benchmark or inflation) with O(log n) date lookup

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::daycount::year_fraction;
use crate::error::{EngineError, Result};

/// Strictly positive index values keyed by date, sorted ascending
///
/// Lookups resolve a missing date to the most recent observation on or before
/// it (the last published value still in force). Dates before the first
/// observation resolve to the first value; callers that must not read before
/// the series start check coverage with [`IndexSeries::require_coverage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIndexSeries")]
pub struct IndexSeries {
    name: String,
    points: Vec<(NaiveDate, f64)>,
}

/// Unvalidated serde form; deserialized series go through [`IndexSeries::new`]
#[derive(Deserialize)]
struct RawIndexSeries {
    name: String,
    points: Vec<(NaiveDate, f64)>,
}

impl TryFrom<RawIndexSeries> for IndexSeries {
    type Error = EngineError;

    fn try_from(raw: RawIndexSeries) -> Result<Self> {
        Self::new(raw.name, raw.points)
    }
}

impl IndexSeries {
    /// Build a series from unordered points; duplicate dates keep the last value
    pub fn new(name: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let name = name.into();
        if points.is_empty() {
            return Err(EngineError::InvalidSeries(format!("index '{}' is empty", name)));
        }
        if let Some((date, value)) = points.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0) {
            return Err(EngineError::InvalidSeries(format!(
                "index '{}' has non-positive value {} on {}",
                name, value, date
            )));
        }

        // Stable sort keeps input order among equal dates, so the last one wins below
        points.sort_by_key(|(date, _)| *date);
        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.0 == point.0 => *last = point,
                _ => deduped.push(point),
            }
        }

        Ok(Self { name, points: deduped })
    }

    /// Accumulate periodic percentage rates (e.g. monthly IPCA, daily CDI)
    /// into an index normalized to 1.0 at the first date
    pub fn from_period_rates(name: impl Into<String>, rates_pct: &[(NaiveDate, f64)]) -> Result<Self> {
        let mut factor = 1.0;
        let mut accumulated = Vec::with_capacity(rates_pct.len());
        for &(date, rate) in rates_pct {
            factor *= 1.0 + rate / 100.0;
            accumulated.push((date, factor));
        }

        let base = accumulated.first().map(|(_, v)| *v).unwrap_or(1.0);
        let normalized = accumulated
            .into_iter()
            .map(|(date, value)| (date, value / base))
            .collect();
        Self::new(name, normalized)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].0
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].0
    }

    /// Value in force at `date`, together with the observation date used
    pub fn lookup(&self, date: NaiveDate) -> (f64, NaiveDate) {
        // Number of points dated on or before `date`
        let idx = self.points.partition_point(|(d, _)| *d <= date);
        let (found, value) = if idx == 0 { self.points[0] } else { self.points[idx - 1] };
        (value, found)
    }

    /// Value in force at `date`
    pub fn value_at(&self, date: NaiveDate) -> f64 {
        self.lookup(date).0
    }

    /// Fail with `IndexUnavailable` if `start` precedes the first observation
    pub fn require_coverage(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start < self.first_date() {
            return Err(EngineError::IndexUnavailable {
                requested_start: start,
                requested_end: end,
                available_start: self.first_date(),
                available_end: self.last_date(),
            });
        }
        Ok(())
    }

    /// Annualized growth between the first and last observation
    pub fn annualized_growth(&self) -> Option<f64> {
        let (first_date, first) = self.points[0];
        let (last_date, last) = self.points[self.points.len() - 1];
        let years = year_fraction(first_date, last_date);
        if years <= 0.0 {
            return None;
        }
        Some((last / first).powf(1.0 / years) - 1.0)
    }

    /// Value at `date`, extending past the last observation at the series'
    /// own historical growth rate
    ///
    /// Only forecasting asks for this; every historical computation uses
    /// [`IndexSeries::value_at`].
    pub fn value_extrapolated(&self, date: NaiveDate) -> f64 {
        let last_date = self.last_date();
        if date <= last_date {
            return self.value_at(date);
        }
        let last = self.points[self.points.len() - 1].1;
        match self.annualized_growth() {
            Some(growth) => last * (1.0 + growth).powf(year_fraction(last_date, date)),
            None => last,
        }
    }

    /// New series with every value transformed by `f(date, value)`
    pub fn map_values<F>(&self, name: impl Into<String>, f: F) -> Result<Self>
    where
        F: Fn(NaiveDate, f64) -> f64,
    {
        let points = self.points.iter().map(|&(date, value)| (date, f(date, value))).collect();
        Self::new(name, points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly() -> IndexSeries {
        IndexSeries::new(
            "test",
            vec![
                (d(2020, 3, 1), 1.008016),
                (d(2020, 1, 1), 1.0),
                (d(2020, 2, 1), 1.004),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_on_construction() {
        let idx = monthly();
        assert_eq!(idx.first_date(), d(2020, 1, 1));
        assert_eq!(idx.last_date(), d(2020, 3, 1));
    }

    #[test]
    fn test_exact_match() {
        let (value, date) = monthly().lookup(d(2020, 2, 1));
        assert_relative_eq!(value, 1.004);
        assert_eq!(date, d(2020, 2, 1));
    }

    #[test]
    fn test_between_dates_uses_previous_observation() {
        let (value, date) = monthly().lookup(d(2020, 2, 15));
        assert_relative_eq!(value, 1.004);
        assert_eq!(date, d(2020, 2, 1));
    }

    #[test]
    fn test_after_last_uses_last_value() {
        assert_relative_eq!(monthly().value_at(d(2021, 1, 1)), 1.008016);
    }

    #[test]
    fn test_before_first_resolves_to_first() {
        assert_relative_eq!(monthly().value_at(d(2019, 1, 1)), 1.0);
    }

    #[test]
    fn test_coverage_check() {
        let idx = monthly();
        assert!(idx.require_coverage(d(2020, 1, 1), d(2020, 6, 1)).is_ok());
        let err = idx.require_coverage(d(2019, 12, 1), d(2020, 6, 1)).unwrap_err();
        assert!(matches!(err, EngineError::IndexUnavailable { .. }));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(IndexSeries::new("x", vec![]).is_err());
        assert!(IndexSeries::new("x", vec![(d(2020, 1, 1), 0.0)]).is_err());
        assert!(IndexSeries::new("x", vec![(d(2020, 1, 1), f64::NAN)]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let empty = serde_json::from_str::<IndexSeries>(r#"{"name":"x","points":[]}"#);
        assert!(empty.is_err());

        let negative = serde_json::from_str::<IndexSeries>(r#"{"name":"x","points":[["2020-01-01",-1.0]]}"#);
        assert!(negative.is_err());

        let unsorted: IndexSeries = serde_json::from_str(
            r#"{"name":"x","points":[["2020-03-01",1.02],["2020-01-01",1.0],["2020-02-01",1.01]]}"#,
        )
        .unwrap();
        assert_eq!(unsorted.first_date(), d(2020, 1, 1));
        assert_relative_eq!(unsorted.value_at(d(2020, 2, 15)), 1.01);
    }

    #[test]
    fn test_serde_round_trip_keeps_series() {
        let idx = monthly();
        let back: IndexSeries = serde_json::from_str(&serde_json::to_string(&idx).unwrap()).unwrap();
        assert_eq!(back, idx);
    }

    #[test]
    fn test_duplicate_dates_keep_last() {
        let idx = IndexSeries::new("x", vec![(d(2020, 1, 1), 1.0), (d(2020, 1, 1), 2.0)]).unwrap();
        assert_eq!(idx.len(), 1);
        assert_relative_eq!(idx.value_at(d(2020, 1, 1)), 2.0);
    }

    #[test]
    fn test_from_period_rates() {
        let rates = vec![(d(2020, 1, 1), 0.5), (d(2020, 2, 1), 1.0), (d(2020, 3, 1), 1.0)];
        let idx = IndexSeries::from_period_rates("ipca", &rates).unwrap();
        assert_relative_eq!(idx.value_at(d(2020, 1, 1)), 1.0);
        assert_relative_eq!(idx.value_at(d(2020, 3, 1)), 1.01 * 1.01, epsilon = 1e-12);
    }

    #[test]
    fn test_extrapolation_grows_past_last_date() {
        let idx = monthly();
        let last = idx.value_at(idx.last_date());
        assert!(idx.value_extrapolated(d(2020, 6, 1)) > last);
        assert_relative_eq!(idx.value_extrapolated(d(2020, 2, 1)), 1.004);
    }

    #[test]
    fn test_single_point_extrapolation_is_flat() {
        let idx = IndexSeries::new("x", vec![(d(2020, 1, 1), 1.0)]).unwrap();
        assert_relative_eq!(idx.value_extrapolated(d(2021, 1, 1)), 1.0);
    }
}

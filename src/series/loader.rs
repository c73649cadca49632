//! Load account records and index series from CSV files
//!
//! Expected columns:
//! - cashflows: `date,amount,category` (category: participant/sponsor)
//! - snapshots: `date,quota_count,unit_value[,position]`
//! - index series: `date,value`

use super::{CashflowEvent, Category, IndexSeries, PositionSnapshot};
use chrono::NaiveDate;
use csv::Reader;
use std::error::Error;
use std::path::Path;

pub type LoadResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Raw CSV row for a cashflow
#[derive(Debug, serde::Deserialize)]
struct CashflowRow {
    date: NaiveDate,
    amount: f64,
    #[serde(default)]
    category: Option<String>,
}

impl CashflowRow {
    fn to_event(self) -> LoadResult<CashflowEvent> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("participant") | Some("participante") => Category::Participant,
            Some("sponsor") | Some("patrocinador") => Category::Sponsor,
            Some(other) => return Err(format!("Unknown category: {}", other).into()),
        };
        Ok(CashflowEvent::new(self.date, self.amount, category))
    }
}

/// Raw CSV row for a position snapshot
#[derive(Debug, serde::Deserialize)]
struct SnapshotRow {
    date: NaiveDate,
    quota_count: f64,
    unit_value: f64,
    #[serde(default)]
    position: Option<f64>,
}

impl SnapshotRow {
    fn to_snapshot(self) -> PositionSnapshot {
        let mut snapshot = PositionSnapshot::new(self.date, self.quota_count, self.unit_value);
        // Keep a reported position as-is so the reconciler can flag decoupling
        if let Some(position) = self.position {
            snapshot.position = position;
        }
        snapshot
    }
}

/// Raw CSV row for an index observation
#[derive(Debug, serde::Deserialize)]
struct IndexRow {
    date: NaiveDate,
    value: f64,
}

/// Load cashflows from any reader (e.g., string buffer, network stream)
pub fn load_cashflows_from_reader<R: std::io::Read>(reader: R) -> LoadResult<Vec<CashflowEvent>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut events = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CashflowRow = result?;
        events.push(row.to_event()?);
    }

    events.sort_by_key(|e| e.date);
    Ok(events)
}

/// Load cashflows from a CSV file
pub fn load_cashflows<P: AsRef<Path>>(path: P) -> LoadResult<Vec<CashflowEvent>> {
    load_cashflows_from_reader(std::fs::File::open(path)?)
}

/// Load position snapshots from any reader
pub fn load_snapshots_from_reader<R: std::io::Read>(reader: R) -> LoadResult<Vec<PositionSnapshot>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut snapshots = Vec::new();

    for result in csv_reader.deserialize() {
        let row: SnapshotRow = result?;
        snapshots.push(row.to_snapshot());
    }

    snapshots.sort_by_key(|s| s.date);
    Ok(snapshots)
}

/// Load position snapshots from a CSV file
pub fn load_snapshots<P: AsRef<Path>>(path: P) -> LoadResult<Vec<PositionSnapshot>> {
    load_snapshots_from_reader(std::fs::File::open(path)?)
}

/// Load an index series from any reader
pub fn load_index_from_reader<R: std::io::Read>(name: &str, reader: R) -> LoadResult<IndexSeries> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut points = Vec::new();

    for result in csv_reader.deserialize() {
        let row: IndexRow = result?;
        points.push((row.date, row.value));
    }

    Ok(IndexSeries::new(name, points)?)
}

/// Load an index series from a CSV file, named after the file stem
pub fn load_index<P: AsRef<Path>>(path: P) -> LoadResult<IndexSeries> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index")
        .to_string();
    load_index_from_reader(&name, std::fs::File::open(path)?)
}

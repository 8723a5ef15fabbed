//! Sales history: CSV import and daily series.
//!
//! Imported files are parsed completely before anything is merged; a single
//! malformed row rejects the whole file. Accepted rows are appended to the
//! master sales CSV in the data directory, which is the source the daily
//! series are rebuilt from.

use crate::{Error, Result, SalesRecord};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%b-%y", "%d-%b-%Y"];

/// Raw CSV row; column names from the brewery's invoice export are accepted
#[derive(Debug, Deserialize)]
struct SalesRow {
    #[serde(alias = "Date Required", alias = "Date")]
    date: String,
    #[serde(alias = "Recipe", alias = "Beer")]
    beer: String,
    #[serde(alias = "Quantity Ordered", alias = "Quantity")]
    quantity: String,
}

/// Row written to the master sales CSV
#[derive(Debug, serde::Serialize)]
struct MasterRow<'a> {
    date: String,
    beer: &'a str,
    quantity: u32,
}

/// Parse a date in any of the accepted formats
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Read every row of a sales CSV
///
/// Fails with [`Error::Import`] if the file is missing, has no rows, or any
/// row cannot be parsed. The error names the offending line.
pub fn read_sales_csv(path: &Path) -> Result<Vec<SalesRecord>> {
    if !path.exists() {
        return Err(Error::Import(format!("file not found: {}", path.display())));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::Import(format!("cannot open {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for result in reader.deserialize::<SalesRow>() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            Error::Import(format!("line {}: {}", line, e))
        })?;
        // Header is line 1, so the first data row is line 2
        let line = records.len() + 2;

        let date = parse_date(&row.date)
            .ok_or_else(|| Error::Import(format!("line {}: invalid date {:?}", line, row.date)))?;
        if row.beer.is_empty() {
            return Err(Error::Import(format!("line {}: missing beer name", line)));
        }
        let quantity = row.quantity.parse::<u32>().map_err(|_| {
            Error::Import(format!("line {}: invalid quantity {:?}", line, row.quantity))
        })?;

        records.push(SalesRecord {
            date,
            beer: row.beer,
            quantity,
        });
    }

    if records.is_empty() {
        return Err(Error::Import(format!(
            "no sales rows found in {}",
            path.display()
        )));
    }

    tracing::debug!("Parsed {} sales rows from {:?}", records.len(), path);
    Ok(records)
}

/// New master sales file written beside the current one, not yet in place
///
/// Dropping it without [`StagedSales::commit`] leaves the master untouched.
pub struct StagedSales {
    temp: NamedTempFile,
    target: PathBuf,
    rows: usize,
}

impl StagedSales {
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Replace the master file with the staged one
    pub fn commit(self) -> Result<usize> {
        self.temp
            .persist(&self.target)
            .map_err(|e| Error::Io(e.error))?;
        tracing::info!("Appended {} sales rows to {:?}", self.rows, self.target);
        Ok(self.rows)
    }
}

/// Stage the master sales CSV with `records` appended
///
/// The current master is copied into a temp file in the same directory and
/// the rows are added after it, with headers only when the master is new or
/// empty.
pub fn stage_append(path: &Path, records: &[SalesRecord]) -> Result<StagedSales> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "sales path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    let existing = if path.exists() {
        std::fs::read(path)?
    } else {
        Vec::new()
    };
    temp.write_all(&existing)?;
    if existing.last().map_or(false, |b| *b != b'\n') {
        temp.write_all(b"\n")?;
    }

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(existing.is_empty())
            .from_writer(temp.as_file_mut());
        for record in records {
            writer.serialize(MasterRow {
                date: record.date.format("%Y-%m-%d").to_string(),
                beer: &record.beer,
                quantity: record.quantity,
            })?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    Ok(StagedSales {
        temp,
        target: path.to_path_buf(),
        rows: records.len(),
    })
}

/// Load the master sales CSV
///
/// A missing file is an empty history. A damaged file is logged and treated
/// as empty so the planner stays usable.
pub fn load_master(path: &Path) -> Vec<SalesRecord> {
    if !path.exists() {
        return Vec::new();
    }
    match read_sales_csv(path) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Ignoring sales history at {:?}: {}", path, e);
            Vec::new()
        }
    }
}

/// Daily sales for one beer with no gaps
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailySeries {
    pub start: NaiveDate,
    pub values: Vec<u32>,
}

impl DailySeries {
    /// Last day covered by the series
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.values.len().saturating_sub(1) as i64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sales on a given day, `None` outside the series
    pub fn on(&self, date: NaiveDate) -> Option<u32> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        self.values.get(offset as usize).copied()
    }
}

/// Sales history for every beer, aligned to a common last day
#[derive(Clone, Debug, Default)]
pub struct SalesHistory {
    series: BTreeMap<String, DailySeries>,
}

impl SalesHistory {
    /// Build daily series from raw rows
    ///
    /// Rows for the same beer and day are summed, missing days are zero,
    /// and every series is padded with zeros up to the latest day seen.
    pub fn from_records(records: &[SalesRecord]) -> Self {
        let mut by_beer: BTreeMap<&str, BTreeMap<NaiveDate, u32>> = BTreeMap::new();
        for record in records {
            let day = by_beer
                .entry(record.beer.as_str())
                .or_default()
                .entry(record.date)
                .or_insert(0);
            *day = day.saturating_add(record.quantity);
        }

        let Some(last) = records.iter().map(|r| r.date).max() else {
            return Self::default();
        };

        let mut series = BTreeMap::new();
        for (beer, days) in by_beer {
            let Some((&start, _)) = days.iter().next() else {
                continue;
            };
            let len = (last - start).num_days() as usize + 1;
            let mut values = vec![0; len];
            for (date, quantity) in days {
                values[(date - start).num_days() as usize] = quantity;
            }
            series.insert(beer.to_string(), DailySeries { start, values });
        }

        Self { series }
    }

    pub fn get(&self, beer: &str) -> Option<&DailySeries> {
        self.series.get(beer)
    }

    pub fn beers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DailySeries)> {
        self.series.iter().map(|(beer, series)| (beer.as_str(), series))
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

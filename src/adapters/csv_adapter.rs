//! CSV file bar source.
//!
//! Reads one `{instrument}.csv` per instrument from a base directory. The
//! header names the columns (`Date` plus any [`BarField`] column name), so
//! column order is free and indicator columns are optional. Price and volume
//! cells must hold finite numbers; empty indicator cells read as `NaN`.

use crate::domain::bar::{Bar, BarField};
use crate::domain::error::StratrankError;
use crate::domain::series::BarSeries;
use crate::ports::data_port::BarSource;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const DATE_COLUMN: &str = "Date";
const REQUIRED: [BarField; 5] = [
    BarField::Open,
    BarField::High,
    BarField::Low,
    BarField::Close,
    BarField::Volume,
];

pub struct CsvBarSource {
    base_path: PathBuf,
}

impl CsvBarSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{instrument}.csv"))
    }
}

fn data_error(reason: String) -> StratrankError {
    StratrankError::Data { reason }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        // tolerate a trailing time component
        .or_else(|| NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok())
}

fn parse_value(value: &str) -> Result<f64, std::num::ParseFloatError> {
    let value = value.trim();
    if value.is_empty() {
        Ok(f64::NAN)
    } else {
        value.parse()
    }
}

impl BarSource for CsvBarSource {
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, StratrankError> {
        let path = self.csv_path(instrument);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StratrankError::NoData {
                    instrument: instrument.to_string(),
                });
            }
            Err(e) => {
                return Err(data_error(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error in {}: {}", path.display(), e)))?
            .clone();

        let date_index = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(DATE_COLUMN))
            .ok_or_else(|| data_error(format!("{}: missing Date column", path.display())))?;

        let columns: Vec<(usize, BarField)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.parse::<BarField>().ok().map(|field| (i, field)))
            .collect();
        let fields: BTreeSet<BarField> = columns.iter().map(|&(_, field)| field).collect();

        if let Some(missing) = REQUIRED.iter().find(|f| !fields.contains(f)) {
            return Err(data_error(format!(
                "{}: missing {} column",
                path.display(),
                missing
            )));
        }

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;

            let date_str = record.get(date_index).unwrap_or_default();
            let date = parse_date(date_str).ok_or_else(|| {
                data_error(format!("row {}: invalid date '{}'", row + 1, date_str))
            })?;

            let mut bar = Bar::from_ohlcv(date, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN);
            for &(index, field) in &columns {
                let raw = record.get(index).unwrap_or_default();
                let value = parse_value(raw).map_err(|e| {
                    data_error(format!(
                        "row {}: invalid {} value '{}': {}",
                        row + 1,
                        field,
                        raw,
                        e
                    ))
                })?;
                if !value.is_finite() && REQUIRED.contains(&field) {
                    return Err(data_error(format!(
                        "row {}: {} value is required, got '{}'",
                        row + 1,
                        field,
                        raw.trim()
                    )));
                }
                bar.set(field, value);
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        Ok(BarSeries::with_fields(bars, fields)?)
    }

    fn list_instruments(&self) -> Result<Vec<String>, StratrankError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {e}")))?;
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                instruments.push(stem.to_string_lossy().into_owned());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}

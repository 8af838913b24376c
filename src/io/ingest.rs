//! CSV ingest and normalization.
//!
//! This module turns a `ds,y` CSV into typed, date-sorted `Observation`s.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Missing values are data**: an empty/`NaN` `y` is kept as `None`
//! - **Deterministic behavior** (no hidden reordering beyond sorting by date)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::Observation;
use crate::error::AppError;

/// Summary stats about the loaded series.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_rows: usize,
    /// Rows with a defined `y`.
    pub n_observed: usize,
    pub ds_min: NaiveDate,
    pub ds_max: NaiveDate,
    /// `None` when no row has a defined `y`.
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

/// Ingest output: observations sorted by `ds` + stats.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub observations: Vec<Observation>,
    pub stats: DatasetStats,
}

impl Dataset {
    /// The first `n` rows (the dashboard preview).
    pub fn head(&self, n: usize) -> &[Observation] {
        &self.observations[..n.min(self.observations.len())]
    }
}

/// Load a `ds,y` CSV file.
pub fn load_observations(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let dataset = read_observations(file)?;
    info!(
        path = %path.display(),
        rows = dataset.stats.n_rows,
        observed = dataset.stats.n_observed,
        "loaded observations"
    );
    Ok(dataset)
}

/// Parse observations from any CSV reader.
pub fn read_observations<R: Read>(input: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let ds_idx = *header_map
        .get("ds")
        .ok_or_else(|| AppError::input("Missing required column: `ds`"))?;
    let y_idx = *header_map
        .get("y")
        .ok_or_else(|| AppError::input("Missing required column: `y`"))?;

    let mut observations = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::input(format!("CSV parse error on line {line}: {e}")))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        observations.push(parse_row(&record, ds_idx, y_idx).map_err(|e| AppError::input(format!("Line {line}: {e}")))?);
    }

    observations.sort_by_key(|o| o.ds);
    if let Some(w) = observations.windows(2).find(|w| w[0].ds == w[1].ds) {
        return Err(AppError::input(format!("Duplicate `ds` value: {}", w[0].ds)));
    }

    let stats = compute_stats(&observations)
        .ok_or_else(|| AppError::no_data("CSV contains no data rows."))?;
    debug!(?stats, "dataset stats");

    Ok(Dataset { observations, stats })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, ds_idx: usize, y_idx: usize) -> Result<Observation, String> {
    let ds_raw = record
        .get(ds_idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing required value: `ds`".to_string())?;
    let ds = parse_date(ds_raw)?;
    let y = parse_y(record.get(y_idx).unwrap_or(""))?;
    Ok(Observation { ds, y })
}

/// Parse a `ds` cell.
///
/// Accepts ISO dates, ISO timestamps (time of day dropped), `YYYY/MM/DD`,
/// `YYYY-MM` (first of month) and a bare `YYYY` (January 1).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Some((y, m)) = s.split_once('-') {
        if let (Ok(y), Ok(m)) = (y.parse::<i32>(), m.parse::<u32>()) {
            if let Some(d) = NaiveDate::from_ymd_opt(y, m, 1) {
                return Ok(d);
            }
        }
    }
    if s.len() == 4 {
        if let Some(d) = s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)) {
            return Ok(d);
        }
    }

    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, YYYY-MM-DD HH:MM:SS, YYYY-MM, YYYY."
    ))
}

/// Parse a `y` cell; empty and NA-like markers are missing values.
fn parse_y(s: &str) -> Result<Option<f64>, String> {
    if s.is_empty() || matches!(s.to_ascii_lowercase().as_str(), "nan" | "na" | "n/a" | "null" | "none") {
        return Ok(None);
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid `y` value '{s}'."))?;
    Ok(if v.is_finite() { Some(v) } else { None })
}

fn compute_stats(observations: &[Observation]) -> Option<DatasetStats> {
    let first = observations.first()?;
    let last = observations.last()?;

    let ys: Vec<f64> = observations.iter().filter_map(|o| o.y).collect();
    let y_min = ys.iter().copied().reduce(f64::min);
    let y_max = ys.iter().copied().reduce(f64::max);

    Some(DatasetStats {
        n_rows: observations.len(),
        n_observed: ys.len(),
        ds_min: first.ds,
        ds_max: last.ds,
        y_min,
        y_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn loads_sorted_rows_with_missing_values() {
        let csv = "\u{feff}ds,y,extra\n1750-01-01,83.4,a\n1749-01-01,80.9,b\n1751-01-01,,c\n1752-01-01,NaN,d\n";
        let data = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(data.observations.len(), 4);
        assert_eq!(data.observations[0], Observation { ds: d(1749, 1, 1), y: Some(80.9) });
        assert_eq!(data.observations[2].y, None);
        assert_eq!(data.observations[3].y, None);
        assert_eq!(data.stats.n_observed, 2);
        assert_eq!(data.stats.y_max, Some(83.4));
        assert_eq!(data.head(2).len(), 2);
        assert_eq!(data.head(10).len(), 4);
    }

    #[test]
    fn missing_columns_are_input_errors() {
        let err = read_observations("date,y\n2020-01-01,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), AppError::INPUT);
        assert!(err.message().contains("`ds`"));

        let err = read_observations("ds,value\n2020-01-01,1\n".as_bytes()).unwrap_err();
        assert!(err.message().contains("`y`"));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let err = read_observations("ds,y\n2020-01-01,1\n2020-01-01,2\n".as_bytes()).unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn empty_file_has_no_data() {
        let err = read_observations("ds,y\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), AppError::NO_DATA);
    }

    #[test]
    fn bad_values_report_the_line() {
        let err = read_observations("ds,y\n2020-01-01,1\n2021-01-01,abc\n".as_bytes()).unwrap_err();
        assert!(err.message().starts_with("Line 3"));

        let err = read_observations("ds,y\nyesterday,1\n".as_bytes()).unwrap_err();
        assert!(err.message().contains("Invalid date"));
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("1749-01-31").unwrap(), d(1749, 1, 31));
        assert_eq!(parse_date("1749/01/31").unwrap(), d(1749, 1, 31));
        assert_eq!(parse_date("1749-01-31 00:00:00").unwrap(), d(1749, 1, 31));
        assert_eq!(parse_date("1749-03").unwrap(), d(1749, 3, 1));
        assert_eq!(parse_date("1749").unwrap(), d(1749, 1, 1));
        assert!(parse_date("31/01/1749").is_err());
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = load_observations(Path::new("does/not/exist.csv")).unwrap_err();
        assert_eq!(err.exit_code(), AppError::INPUT);
    }
}

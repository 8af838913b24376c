//! Export forecasts, residuals and fitted parameters.
//!
//! The CSV exports are meant to be easy to consume in spreadsheets or
//! downstream scripts; missing values are written as empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::domain::{Forecast, ModelFile, ResidualRow};
use crate::error::AppError;

/// Write the forecast table (one column per seasonal component) to CSV.
pub fn write_forecast_csv(path: &Path, forecast: &Forecast) -> Result<(), AppError> {
    let file = create(path, "forecast CSV")?;
    write_forecast(file, forecast)?;
    info!(path = %path.display(), rows = forecast.len(), "wrote forecast CSV");
    Ok(())
}

/// Write the residual table to CSV.
pub fn write_residuals_csv(path: &Path, residuals: &[ResidualRow]) -> Result<(), AppError> {
    let file = create(path, "residuals CSV")?;
    write_residuals(file, residuals)?;
    info!(path = %path.display(), rows = residuals.len(), "wrote residuals CSV");
    Ok(())
}

/// Write fitted parameters as pretty JSON.
pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    let file = create(path, "model JSON")?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::output(format!("Failed to write model JSON: {e}")))?;
    info!(path = %path.display(), "wrote model JSON");
    Ok(())
}

/// Serialize the forecast table to any writer.
pub fn write_forecast<W: Write>(out: W, forecast: &Forecast) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = vec![
        "ds",
        "yhat",
        "yhat_lower",
        "yhat_upper",
        "trend",
        "trend_lower",
        "trend_upper",
        "additive_terms",
    ];
    header.extend(forecast.component_names.iter().map(String::as_str));
    writer.write_record(&header).map_err(write_err)?;

    for r in &forecast.rows {
        let mut record = vec![
            r.ds.to_string(),
            fmt_num(r.yhat),
            fmt_num(r.yhat_lower),
            fmt_num(r.yhat_upper),
            fmt_num(r.trend),
            fmt_num(r.trend_lower),
            fmt_num(r.trend_upper),
            fmt_num(r.additive_terms),
        ];
        for name in &forecast.component_names {
            record.push(r.component(name).map(fmt_num).unwrap_or_default());
        }
        writer.write_record(&record).map_err(write_err)?;
    }

    writer.flush().map_err(|e| AppError::output(format!("Failed to flush CSV: {e}")))
}

/// Serialize the residual table to any writer.
pub fn write_residuals<W: Write>(out: W, residuals: &[ResidualRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["ds", "y", "yhat", "residual"])
        .map_err(write_err)?;
    for r in residuals {
        writer
            .write_record([
                r.ds.to_string(),
                r.y.map(fmt_num).unwrap_or_default(),
                r.yhat.map(fmt_num).unwrap_or_default(),
                r.residual.map(fmt_num).unwrap_or_default(),
            ])
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| AppError::output(format!("Failed to flush CSV: {e}")))
}

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::output(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn write_err(e: csv::Error) -> AppError {
    AppError::output(format!("Failed to write CSV row: {e}"))
}

fn fmt_num(v: f64) -> String {
    format!("{v:.6}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::ForecastRow;

    #[test]
    fn residual_csv_leaves_missing_cells_empty() {
        let ds = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let rows = [
            ResidualRow { ds, y: Some(10.0), yhat: Some(9.5), residual: Some(0.5) },
            ResidualRow { ds: ds.succ_opt().unwrap(), y: None, yhat: Some(9.0), residual: None },
        ];
        let mut buf = Vec::new();
        write_residuals(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ds,y,yhat,residual");
        assert_eq!(lines[1], "2020-01-01,10.000000,9.500000,0.500000");
        assert_eq!(lines[2], "2020-01-02,,9.000000,");
    }

    #[test]
    fn forecast_csv_has_a_column_per_component() {
        let ds = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let forecast = Forecast {
            rows: vec![ForecastRow {
                ds,
                yhat: 3.0,
                yhat_lower: 2.0,
                yhat_upper: 4.0,
                trend: 1.0,
                trend_lower: 1.0,
                trend_upper: 1.0,
                additive_terms: 2.0,
                components: BTreeMap::from([("sunspot_cycle".to_string(), 2.0)]),
            }],
            component_names: vec!["sunspot_cycle".to_string()],
        };
        let mut buf = Vec::new();
        write_forecast(&mut buf, &forecast).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.ends_with(",additive_terms,sunspot_cycle"));
        assert_eq!(text.lines().count(), 2);
    }
}

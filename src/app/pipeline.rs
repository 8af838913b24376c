//! Shared forecast pipeline used by both the dashboard and report front ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV load -> fit -> future dates -> predict -> residuals -> summary
//!
//! The front ends can then focus on presentation (HTML vs terminal text).

use tracing::info;

use crate::domain::{Forecast, ResidualRow, ResidualSummary, RunConfig};
use crate::error::AppError;
use crate::fit::{FittedModel, Forecaster};
use crate::io::ingest::{Dataset, load_observations};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub model: FittedModel,
    pub forecast: Forecast,
    pub residuals: Vec<ResidualRow>,
    pub summary: ResidualSummary,
}

/// Execute the full pipeline, reading observations from `config.csv_path`.
pub fn run_forecast(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Load and validate the CSV.
    let dataset = load_observations(&config.csv_path)?;

    run_forecast_on(dataset, config)
}

/// Execute the pipeline on an already loaded dataset.
///
/// Useful for tests and for callers that build observations in memory.
pub fn run_forecast_on(dataset: Dataset, config: &RunConfig) -> Result<RunOutput, AppError> {
    // 2) Fit the additive model.
    let forecaster = Forecaster::new(config.forecast.clone())?;
    let model = forecaster.fit(&dataset.observations)?;

    // 3) History plus the extrapolation horizon.
    let dates = model.make_future_dates(config.periods, config.freq, true)?;
    let forecast = model.predict(&dates)?;
    info!(
        rows = forecast.len(),
        periods = config.periods,
        freq = ?config.freq,
        "forecast ready"
    );

    // 4) Residuals and their summary.
    let residuals = crate::report::compute_residuals(&dataset.observations, &forecast);
    let summary = crate::report::describe(&residuals);
    info!(
        residuals = residuals.len(),
        defined = summary.count,
        "residuals computed"
    );

    Ok(RunOutput {
        dataset,
        model,
        forecast,
        residuals,
        summary,
    })
}

//! Command-line parsing for the sunspot forecast dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Frequency, Variant};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sunspot", version, about = "Sunspot cycle forecast dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit, forecast and write the HTML dashboard.
    Dashboard(DashboardArgs),
    /// Fit, forecast and print the same sections to the terminal.
    Report(ForecastArgs),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Input CSV with `ds` and `y` columns.
    #[arg(long, env = "SUNSPOT_CSV", default_value = "data/sunspots_for_prophet.csv")]
    pub csv: PathBuf,

    /// Which seasonal terms the model carries.
    #[arg(long, value_enum, default_value_t = Variant::CycleOnly)]
    pub variant: Variant,

    /// Number of future periods to forecast.
    #[arg(long, default_value_t = 30)]
    pub periods: usize,

    /// Spacing of the future periods.
    #[arg(long, value_enum, default_value_t = Frequency::YearEnd)]
    pub freq: Frequency,

    /// Period of the solar-cycle seasonality, in years.
    #[arg(long, default_value_t = 11.0)]
    pub cycle_years: f64,

    /// Fourier order of the solar-cycle seasonality.
    #[arg(long, default_value_t = 5)]
    pub cycle_order: usize,

    /// Trend flexibility (Laplace prior scale on rate changes).
    #[arg(long, default_value_t = 0.05)]
    pub changepoint_prior_scale: f64,

    /// Width of the prediction interval, in (0, 1).
    #[arg(long, default_value_t = 0.8)]
    pub interval_width: f64,

    /// Simulation draws for the prediction interval (0 disables intervals).
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Random seed for the interval simulation.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Export the forecast table to CSV.
    #[arg(long = "export-forecast", value_name = "CSV")]
    pub export_forecast: Option<PathBuf>,

    /// Export observations joined with predictions to CSV.
    #[arg(long = "export-residuals", value_name = "CSV")]
    pub export_residuals: Option<PathBuf>,

    /// Export fitted parameters to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,

    /// Terminal plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Terminal plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for `sunspot dashboard`.
#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub forecast: ForecastArgs,

    /// Output HTML path (`-` writes to stdout).
    #[arg(long, short = 'o', default_value = "dashboard.html")]
    pub out: PathBuf,
}

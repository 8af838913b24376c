//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the forecast pipeline
//! - renders the dashboard or the terminal report
//! - writes optional exports

use std::io::Write;
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Command, DashboardArgs, ForecastArgs};
use crate::domain::{ForecastConfig, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sunspot` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(AppError::input(format!("Failed to read .env: {e}"))),
    }
    init_tracing();

    // We want `sunspot` and `sunspot --variant ...` to behave like
    // `sunspot dashboard ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Dashboard(args) => handle_dashboard(args),
        Command::Report(args) => handle_report(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sunspot_forecast=info"));

    // Logs go to stderr so `--out -` can stream HTML on stdout.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn handle_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.forecast);
    let run = pipeline::run_forecast(&config)?;

    let html = crate::dashboard::render_dashboard(&run, &config)?;
    if args.out == Path::new("-") {
        std::io::stdout()
            .write_all(html.as_bytes())
            .map_err(|e| AppError::output(format!("Failed to write dashboard to stdout: {e}")))?;
    } else {
        std::fs::write(&args.out, html)
            .map_err(|e| AppError::output(format!("Failed to write dashboard '{}': {e}", args.out.display())))?;
        info!(path = %args.out.display(), "wrote dashboard");
    }

    write_exports(&run, &config)
}

fn handle_report(args: ForecastArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_forecast(&config)?;

    print!("{}", crate::report::render_report(&run, &config));

    write_exports(&run, &config)
}

fn write_exports(run: &pipeline::RunOutput, config: &RunConfig) -> Result<(), AppError> {
    if let Some(path) = &config.export_forecast {
        crate::io::export::write_forecast_csv(path, &run.forecast)?;
    }
    if let Some(path) = &config.export_residuals {
        crate::io::export::write_residuals_csv(path, &run.residuals)?;
    }
    if let Some(path) = &config.export_model {
        crate::io::export::write_model_json(path, &run.model.to_model_file())?;
    }
    Ok(())
}

pub fn run_config_from_args(args: &ForecastArgs) -> RunConfig {
    let mut forecast = ForecastConfig::for_variant(args.variant, args.cycle_years, args.cycle_order);
    forecast.changepoint_prior_scale = args.changepoint_prior_scale;
    forecast.interval_width = args.interval_width;
    forecast.uncertainty_samples = args.samples;
    forecast.seed = args.seed;

    RunConfig {
        forecast,
        periods: args.periods,
        freq: args.freq,
        plot_width: args.width,
        plot_height: args.height,
        export_forecast: args.export_forecast.clone(),
        export_residuals: args.export_residuals.clone(),
        export_model: args.export_model.clone(),
        ..RunConfig::new(args.csv.clone(), args.variant)
    }
}

/// Rewrite argv so `sunspot` defaults to `sunspot dashboard`.
///
/// Rules:
/// - `sunspot`                      -> `sunspot dashboard`
/// - `sunspot --variant X ...`      -> `sunspot dashboard --variant X ...`
/// - `sunspot --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "dashboard" | "report");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "dashboard flags".
    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

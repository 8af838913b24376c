//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and rendering
//! - exported to CSV/JSON
//! - compared across runs in tests

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Days per year used to convert cycle lengths (years) into seasonal periods (days).
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Name of the custom solar-cycle seasonality.
pub const SUNSPOT_CYCLE: &str = "sunspot_cycle";

/// Forecast column holding the trend.
pub const TREND: &str = "trend";

/// Which dashboard layout and seasonality setup to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Default seasonalities off; only the solar cycle term is fitted.
    /// Components are shown as two separate plots (trend, cycle).
    CycleOnly,
    /// Default seasonalities resolved automatically, plus the solar cycle.
    /// Components are shown as one combined figure.
    DefaultSeasonality,
}

impl Variant {
    pub fn display_name(self) -> &'static str {
        match self {
            Variant::CycleOnly => "cycle only",
            Variant::DefaultSeasonality => "default seasonality",
        }
    }
}

/// Tri-state switch for the built-in seasonalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityToggle {
    /// Enable when the history is long/dense enough.
    Auto,
    On,
    Off,
}

/// Spacing of extrapolated future dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Day,
    Week,
    /// Last day of each month.
    MonthEnd,
    /// December 31 of each year.
    YearEnd,
}

/// A periodic component modelled by Fourier terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalitySpec {
    pub name: String,
    /// Period in days.
    pub period_days: f64,
    pub fourier_order: usize,
    /// Larger values let the component fit larger swings.
    pub prior_scale: f64,
}

impl SeasonalitySpec {
    pub fn new(name: impl Into<String>, period_days: f64, fourier_order: usize, prior_scale: f64) -> Self {
        Self {
            name: name.into(),
            period_days,
            fourier_order,
            prior_scale,
        }
    }

    /// The solar activity cycle, expressed in years.
    pub fn sunspot_cycle(years: f64, fourier_order: usize, prior_scale: f64) -> Self {
        Self::new(SUNSPOT_CYCLE, years * DAYS_PER_YEAR, fourier_order, prior_scale)
    }
}

/// Model configuration understood by the forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub yearly_seasonality: SeasonalityToggle,
    pub weekly_seasonality: SeasonalityToggle,
    pub daily_seasonality: SeasonalityToggle,
    /// Custom seasonalities registered before fitting.
    pub seasonalities: Vec<SeasonalitySpec>,

    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    /// Prior scale applied to the built-in seasonalities.
    pub seasonality_prior_scale: f64,

    /// Coverage of the prediction interval (e.g. 0.8).
    pub interval_width: f64,
    /// Number of simulation draws used for the intervals (0 disables them).
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            yearly_seasonality: SeasonalityToggle::Auto,
            weekly_seasonality: SeasonalityToggle::Auto,
            daily_seasonality: SeasonalityToggle::Auto,
            seasonalities: Vec::new(),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

impl ForecastConfig {
    /// Configuration for one of the dashboard variants.
    ///
    /// Both variants register the solar cycle; they differ only in whether the
    /// built-in seasonalities may be enabled.
    pub fn for_variant(variant: Variant, cycle_years: f64, cycle_order: usize) -> Self {
        let mut config = Self::default();
        if variant == Variant::CycleOnly {
            config.yearly_seasonality = SeasonalityToggle::Off;
            config.weekly_seasonality = SeasonalityToggle::Off;
            config.daily_seasonality = SeasonalityToggle::Off;
        }
        config.seasonalities.push(SeasonalitySpec::sunspot_cycle(
            cycle_years,
            cycle_order,
            config.seasonality_prior_scale,
        ));
        config
    }
}

/// One historical observation. `y` is `None` when the CSV cell is empty/NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ds: NaiveDate,
    pub y: Option<f64>,
}

/// One row of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub trend_lower: f64,
    pub trend_upper: f64,
    /// Sum of all seasonal components.
    pub additive_terms: f64,
    /// Per-seasonality contribution, keyed by seasonality name.
    pub components: BTreeMap<String, f64>,
}

impl ForecastRow {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components.get(name).copied()
    }
}

/// Model output for a set of dates, sorted by `ds`.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub rows: Vec<ForecastRow>,
    /// Names of the fitted seasonal components, in fit order.
    pub component_names: Vec<String>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(ds, value)` pairs for a named column (`yhat`, `trend`, or a component).
    pub fn series(&self, column: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let pick: fn(&ForecastRow) -> f64 = match column {
            "yhat" => |r: &ForecastRow| r.yhat,
            "yhat_lower" => |r: &ForecastRow| r.yhat_lower,
            "yhat_upper" => |r: &ForecastRow| r.yhat_upper,
            "trend" => |r: &ForecastRow| r.trend,
            "additive_terms" => |r: &ForecastRow| r.additive_terms,
            name => {
                if !self.component_names.iter().any(|c| c == name) {
                    return None;
                }
                return Some(
                    self.rows
                        .iter()
                        .map(|r| (r.ds, r.component(name).unwrap_or(0.0)))
                        .collect(),
                );
            }
        };
        Some(self.rows.iter().map(|r| (r.ds, pick(r))).collect())
    }
}

/// An observation left-joined with its forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRow {
    pub ds: NaiveDate,
    pub y: Option<f64>,
    pub yhat: Option<f64>,
    /// `y - yhat`; `None` when either side is missing.
    pub residual: Option<f64>,
}

/// Descriptive statistics of the defined residuals.
///
/// Every field except `count` is `None` when there are no values; `std` is
/// also `None` for a single value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Fitted parameters, exported as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub ds_start: NaiveDate,
    pub ds_end: NaiveDate,
    pub y_scale: f64,
    /// In-sample residual RMS, in `y` units.
    pub sigma_obs: f64,
    pub trend: TrendParams,
    pub seasonalities: Vec<FittedSeasonality>,
}

/// Piecewise-linear trend parameters in scaled units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// Base growth rate.
    pub k: f64,
    /// Offset.
    pub m: f64,
    /// Changepoint locations in scaled time.
    pub changepoints_t: Vec<f64>,
    /// Rate adjustments at each changepoint.
    pub deltas: Vec<f64>,
}

/// A fitted seasonal block: its spec plus Fourier coefficients (scaled units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSeasonality {
    pub spec: SeasonalitySpec,
    pub coefficients: Vec<f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv_path: PathBuf,
    pub variant: Variant,
    pub forecast: ForecastConfig,
    pub periods: usize,
    pub freq: Frequency,

    pub preview_rows: usize,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_forecast: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
}

impl RunConfig {
    /// Dashboard defaults: 30 year-end periods, a five row preview.
    pub fn new(csv_path: impl Into<PathBuf>, variant: Variant) -> Self {
        Self {
            csv_path: csv_path.into(),
            variant,
            forecast: ForecastConfig::for_variant(variant, 11.0, 5),
            periods: 30,
            freq: Frequency::YearEnd,
            preview_rows: 5,
            plot_width: 100,
            plot_height: 20,
            export_forecast: None,
            export_residuals: None,
            export_model: None,
        }
    }
}

//! Plotting front ends.
//!
//! - `ascii`: fixed-size character grids for the terminal report
//! - `svg`: Plotters charts embedded in the HTML dashboard
//!
//! Both plot against a decimal-year x axis (see [`year_fraction`]).

use chrono::{Datelike, NaiveDate};

use crate::domain::{Observation, ResidualRow};

pub mod ascii;
pub mod svg;

pub use ascii::*;

/// Date as a decimal year, e.g. 2020-07-02 -> ~2020.5.
pub fn year_fraction(ds: NaiveDate) -> f64 {
    let days_in_year = if ds.leap_year() { 366.0 } else { 365.0 };
    ds.year() as f64 + (ds.ordinal0() as f64) / days_in_year
}

/// Observations with a defined `y`, as `(decimal year, y)`.
pub fn observed_points(observations: &[Observation]) -> Vec<(f64, f64)> {
    observations
        .iter()
        .filter_map(|o| o.y.map(|y| (year_fraction(o.ds), y)))
        .collect()
}

/// Defined residuals, as `(decimal year, residual)`.
pub fn residual_points(residuals: &[ResidualRow]) -> Vec<(f64, f64)> {
    residuals
        .iter()
        .filter_map(|r| r.residual.map(|v| (year_fraction(r.ds), v)))
        .collect()
}

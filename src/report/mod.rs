//! Reporting utilities: residuals, residual statistics, and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{Forecast, Observation, ResidualRow, ResidualSummary};
use crate::math::{mean, quantile_sorted, sample_std, sorted_copy};

pub mod format;
pub mod terminal;

pub use format::*;
pub use terminal::render_report;

/// Left-join forecasts onto observations by date and compute `y - yhat`.
///
/// Returns exactly one row per observation, in observation order. The
/// residual is `None` when the observation has no `y` or no forecast shares
/// its date.
pub fn compute_residuals(observations: &[Observation], forecast: &Forecast) -> Vec<ResidualRow> {
    let yhat_by_ds: HashMap<NaiveDate, f64> = forecast.rows.iter().map(|r| (r.ds, r.yhat)).collect();

    observations
        .iter()
        .map(|o| {
            let yhat = yhat_by_ds.get(&o.ds).copied();
            let residual = match (o.y, yhat) {
                (Some(y), Some(yhat)) => Some(y - yhat),
                _ => None,
            };
            ResidualRow {
                ds: o.ds,
                y: o.y,
                yhat,
                residual,
            }
        })
        .collect()
}

/// Descriptive statistics of the defined residuals.
pub fn describe(residuals: &[ResidualRow]) -> ResidualSummary {
    let values: Vec<f64> = residuals
        .iter()
        .filter_map(|r| r.residual)
        .filter(|v| v.is_finite())
        .collect();
    let sorted = sorted_copy(&values);

    ResidualSummary {
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        q50: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

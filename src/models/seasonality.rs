//! Seasonality registry and built-in seasonality resolution.
//!
//! The registry holds the seasonal terms that *will* be fitted. Once a model is
//! fitted, its seasonal blocks (column ranges + coefficients) are frozen into
//! the fitted model; later registry edits only affect subsequent fits.

use chrono::NaiveDate;

use crate::domain::{ForecastConfig, SeasonalitySpec, SeasonalityToggle};
use crate::error::AppError;
use crate::math::fill_fourier_row;

/// Built-in seasonalities: `(name, period_days, fourier_order)`.
pub const YEARLY: (&str, f64, usize) = ("yearly", 365.25, 10);
pub const WEEKLY: (&str, f64, usize) = ("weekly", 7.0, 3);
pub const DAILY: (&str, f64, usize) = ("daily", 1.0, 4);

/// Ordered collection of custom seasonal terms, unique by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonalityRegistry {
    entries: Vec<SeasonalitySpec>,
}

impl SeasonalityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a seasonality.
    pub fn add(&mut self, spec: SeasonalitySpec) -> Result<(), AppError> {
        if spec.name.trim().is_empty() {
            return Err(AppError::input("Seasonality name must not be empty."));
        }
        if !(spec.period_days.is_finite() && spec.period_days > 0.0) {
            return Err(AppError::input(format!(
                "Seasonality `{}` needs a positive period (got {}).",
                spec.name, spec.period_days
            )));
        }
        if spec.fourier_order == 0 {
            return Err(AppError::input(format!(
                "Seasonality `{}` needs a Fourier order of at least 1.",
                spec.name
            )));
        }
        if self.contains(&spec.name) {
            return Err(AppError::input(format!(
                "Seasonality `{}` is already registered.",
                spec.name
            )));
        }
        self.entries.push(spec);
        Ok(())
    }

    /// Remove a seasonality by name, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<SeasonalitySpec> {
        let idx = self.entries.iter().position(|s| s.name == name)?;
        Some(self.entries.remove(idx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&SeasonalitySpec> {
        self.entries.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeasonalitySpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the built-in seasonalities for a history.
///
/// `Auto` rules:
/// - yearly: history spans at least two years
/// - weekly: history spans at least two weeks and the smallest gap is under a week
/// - daily: history spans at least two days and the smallest gap is under a day
///
/// Daily data never satisfies the last rule, so `daily` is only fitted when
/// forced `On`. Built-ins shadowed by a registered custom term are skipped.
pub fn resolve_builtin(
    config: &ForecastConfig,
    registry: &SeasonalityRegistry,
    dates: &[NaiveDate],
) -> Vec<SeasonalitySpec> {
    let (span_days, min_gap_days) = history_spacing(dates);

    let candidates = [
        (config.yearly_seasonality, YEARLY, span_days >= 730.0),
        (
            config.weekly_seasonality,
            WEEKLY,
            span_days >= 14.0 && min_gap_days < 7.0,
        ),
        (
            config.daily_seasonality,
            DAILY,
            span_days >= 2.0 && min_gap_days < 1.0,
        ),
    ];

    candidates
        .into_iter()
        .filter(|(toggle, _, auto_ok)| match toggle {
            SeasonalityToggle::On => true,
            SeasonalityToggle::Off => false,
            SeasonalityToggle::Auto => *auto_ok,
        })
        .filter(|(_, (name, _, _), _)| !registry.contains(name))
        .map(|(_, (name, period, order), _)| {
            SeasonalitySpec::new(name, period, order, config.seasonality_prior_scale)
        })
        .collect()
}

fn history_spacing(dates: &[NaiveDate]) -> (f64, f64) {
    let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) else {
        return (0.0, f64::INFINITY);
    };
    let span = (*last - *first).num_days() as f64;
    let min_gap = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days().abs() as f64)
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);
    (span, min_gap)
}

/// Location of one fitted seasonality inside the design matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalBlock {
    pub spec: SeasonalitySpec,
    /// First column (inclusive).
    pub start: usize,
    /// Last column (exclusive).
    pub end: usize,
}

impl SeasonalBlock {
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Fill this block's columns of a design row.
    pub fn fill_row(&self, t_days: f64, row: &mut [f64]) {
        fill_fourier_row(
            t_days,
            self.spec.period_days,
            self.spec.fourier_order,
            &mut row[self.start..self.end],
        );
    }

    /// Contribution of this block given the full coefficient vector.
    pub fn contribution(&self, t_days: f64, coefficients: &[f64]) -> f64 {
        let mut row = vec![0.0; self.width()];
        fill_fourier_row(t_days, self.spec.period_days, self.spec.fourier_order, &mut row);
        row.iter()
            .zip(&coefficients[self.start..self.end])
            .map(|(x, b)| x * b)
            .sum()
    }
}

/// Lay out seasonal blocks one after another, starting at column `first_col`.
pub fn layout_blocks(specs: Vec<SeasonalitySpec>, first_col: usize) -> Vec<SeasonalBlock> {
    let mut col = first_col;
    specs
        .into_iter()
        .map(|spec| {
            let start = col;
            col += 2 * spec.fourier_order;
            SeasonalBlock {
                spec,
                start,
                end: col,
            }
        })
        .collect()
}

//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - interval band: `:`
//! - reference line: `.`
//! - fitted / forecast line: `-`
//! - observed path: `~`
//! - observed points: `o`

use crate::domain::{Forecast, ForecastRow, Observation, ResidualRow, TREND};
use crate::plot::{observed_points, residual_points, year_fraction};

const BAND: char = ':';
const REFERENCE: char = '.';
const LINE: char = '-';
const TRACE: char = '~';
const POINT: char = 'o';

/// One drawable element, in data coordinates (x = decimal year).
#[derive(Debug, Clone, Copy)]
pub enum Layer<'a> {
    /// Vertical fill between `(x, lower, upper)` bounds.
    Band(&'a [(f64, f64, f64)]),
    /// Horizontal reference line at `y`.
    HLine(f64),
    Line(&'a [(f64, f64)]),
    /// Secondary path, drawn under `Line`.
    Trace(&'a [(f64, f64)]),
    Points(&'a [(f64, f64)]),
}

/// Forecast plot: actual points, `yhat` line, interval band.
pub fn render_forecast_plot(observations: &[Observation], forecast: &Forecast, width: usize, height: usize) -> String {
    let actual = observed_points(observations);
    let yhat = column(forecast, |r| r.yhat);
    let band = band(forecast, |r| (r.yhat_lower, r.yhat_upper));

    render_chart(
        "Forecast: actual (o), yhat (-), interval (:)",
        &[Layer::Band(&band), Layer::Line(&yhat), Layer::Points(&actual)],
        width,
        height,
    )
}

/// Actual vs predicted: the observed path with its points, the predicted
/// line and the prediction interval.
pub fn render_overlay_plot(observations: &[Observation], forecast: &Forecast, width: usize, height: usize) -> String {
    let actual = observed_points(observations);
    let yhat = column(forecast, |r| r.yhat);
    let band = band(forecast, |r| (r.yhat_lower, r.yhat_upper));

    render_chart(
        "Actual (o~) | Predicted (-) | Prediction Interval (:)",
        &[
            Layer::Band(&band),
            Layer::Trace(&actual),
            Layer::Line(&yhat),
            Layer::Points(&actual),
        ],
        width,
        height,
    )
}

/// A single forecast column (trend or a seasonal component) over time.
pub fn render_component_plot(
    forecast: &Forecast,
    name: &str,
    title: &str,
    width: usize,
    height: usize,
) -> Option<String> {
    let series: Vec<(f64, f64)> = forecast
        .series(name)?
        .into_iter()
        .map(|(ds, v)| (year_fraction(ds), v))
        .collect();
    Some(render_chart(title, &[Layer::Line(&series)], width, height))
}

/// Stacked component panels: trend with its interval band, then one panel
/// per fitted seasonality.
pub fn render_components_figure(forecast: &Forecast, width: usize, height: usize) -> String {
    let trend = column(forecast, |r| r.trend);
    let trend_band = band(forecast, |r| (r.trend_lower, r.trend_upper));
    let mut out = render_chart(TREND, &[Layer::Band(&trend_band), Layer::Line(&trend)], width, height);

    for name in &forecast.component_names {
        if let Some(panel) = render_component_plot(forecast, name, name, width, height) {
            out.push_str(&panel);
        }
    }
    out
}

/// Residuals over time with a zero reference line.
pub fn render_residual_plot(residuals: &[ResidualRow], width: usize, height: usize) -> String {
    let points = residual_points(residuals);
    render_chart(
        "Residuals (actual - predicted)",
        &[Layer::HLine(0.0), Layer::Line(&points), Layer::Points(&points)],
        width,
        height,
    )
}

fn column(forecast: &Forecast, pick: impl Fn(&ForecastRow) -> f64) -> Vec<(f64, f64)> {
    forecast.rows.iter().map(|r| (year_fraction(r.ds), pick(r))).collect()
}

fn band(forecast: &Forecast, bounds: impl Fn(&ForecastRow) -> (f64, f64)) -> Vec<(f64, f64, f64)> {
    forecast
        .rows
        .iter()
        .map(|r| {
            let (lo, hi) = bounds(r);
            (year_fraction(r.ds), lo, hi)
        })
        .collect()
}

/// Render layers onto a character grid with a one-line header.
pub fn render_chart(title: &str, layers: &[Layer<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(layers).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(layers).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let frame = Frame { x_min, x_max, y_min, y_max, width, height };

    for layer in layers {
        match *layer {
            Layer::Band(band) => {
                for &(x, lo, hi) in band {
                    let col = frame.col(x);
                    let (top, bottom) = (frame.row(hi), frame.row(lo));
                    for row in grid.iter_mut().take(bottom + 1).skip(top) {
                        if row[col] == ' ' {
                            row[col] = BAND;
                        }
                    }
                }
            }
            Layer::HLine(y) => {
                if y >= y_min && y <= y_max {
                    let row = frame.row(y);
                    for cell in grid[row].iter_mut() {
                        if *cell == ' ' || *cell == BAND {
                            *cell = REFERENCE;
                        }
                    }
                }
            }
            Layer::Line(points) => draw_polyline(&mut grid, points, &frame, LINE),
            Layer::Trace(points) => draw_polyline(&mut grid, points, &frame, TRACE),
            Layer::Points(points) => {
                for &(x, y) in points {
                    grid[frame.row(y)][frame.col(x)] = POINT;
                }
            }
        }
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "{title}: x=[{x_min:.1}, {x_max:.1}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn col(&self, x: f64) -> usize {
        let u = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0);
        (u * (self.width as f64 - 1.0)).round() as usize
    }

    fn row(&self, y: f64) -> usize {
        let u = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        // y=top is max -> row 0
        (self.height as f64 - 1.0 - (u * (self.height as f64 - 1.0))).round() as usize
    }
}

fn x_range(layers: &[Layer<'_>]) -> Option<(f64, f64)> {
    let xs = layers.iter().flat_map(|layer| -> Box<dyn Iterator<Item = f64> + '_> {
        match *layer {
            Layer::Band(b) => Box::new(b.iter().map(|p| p.0)),
            Layer::HLine(_) => Box::new(std::iter::empty()),
            Layer::Line(p) | Layer::Trace(p) | Layer::Points(p) => Box::new(p.iter().map(|p| p.0)),
        }
    });
    finite_range(xs)
}

fn y_range(layers: &[Layer<'_>]) -> Option<(f64, f64)> {
    let ys = layers.iter().flat_map(|layer| -> Box<dyn Iterator<Item = f64> + '_> {
        match *layer {
            Layer::Band(b) => Box::new(b.iter().flat_map(|p| [p.1, p.2])),
            Layer::HLine(y) => Box::new(std::iter::once(y)),
            Layer::Line(p) | Layer::Trace(p) | Layer::Points(p) => Box::new(p.iter().map(|p| p.1)),
        }
    });
    finite_range(ys)
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min {
        Some((min, max))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn draw_polyline(grid: &mut [Vec<char>], points: &[(f64, f64)], frame: &Frame, ch: char) {
    let mut prev = None;
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let (c, r) = (frame.col(x), frame.row(y));
        match prev {
            Some((c0, r0)) => draw_line(grid, (c0, r0), (c, r), ch),
            None => set_line_cell(grid, c, r, ch),
        }
        prev = Some((c, r));
    }
}

/// Lines draw over the band and reference line; a `Line` also covers a `Trace`.
fn set_line_cell(grid: &mut [Vec<char>], col: usize, row: usize, ch: char) {
    let cell = &mut grid[row][col];
    if matches!(*cell, ' ' | BAND | REFERENCE) || (ch == LINE && *cell == TRACE) {
        *cell = ch;
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let mut x0 = from.0 as isize;
    let mut y0 = from.1 as isize;
    let x1 = to.0 as isize;
    let y1 = to.1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            set_line_cell(grid, x0 as usize, y0 as usize, ch);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::SUNSPOT_CYCLE;

    fn date(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    /// Ten year-end rows; trend and yhat bands widen with the index.
    fn forecast() -> Forecast {
        let rows = (0..10)
            .map(|i| {
                let t = i as f64;
                let cycle = (t * 0.6).sin() * 5.0;
                ForecastRow {
                    ds: date(1990 + i),
                    yhat: 50.0 + t + cycle,
                    yhat_lower: 40.0 + t + cycle - t,
                    yhat_upper: 60.0 + t + cycle + t,
                    trend: 50.0 + t,
                    trend_lower: 50.0 + t - 2.0 * t,
                    trend_upper: 50.0 + t + 2.0 * t,
                    additive_terms: cycle,
                    components: BTreeMap::from([(SUNSPOT_CYCLE.to_string(), cycle)]),
                }
            })
            .collect();
        Forecast { rows, component_names: vec![SUNSPOT_CYCLE.to_string()] }
    }

    /// Six observations well below the predicted line.
    fn observations() -> Vec<Observation> {
        (0..6).map(|i| Observation { ds: date(1990 + i), y: Some(30.0 + i as f64) }).collect()
    }

    fn body(txt: &str) -> String {
        txt.lines().skip(1).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn forecast_plot_draws_band_line_and_points() {
        let txt = render_forecast_plot(&observations(), &forecast(), 40, 12);
        assert!(txt.starts_with("Forecast: actual (o), yhat (-), interval (:): x=[1991.0, 2000.0]"));
        let body = body(&txt);
        assert_eq!(body.matches('o').count(), 6);
        assert!(body.contains(':') && body.contains('-'));
        assert!(!body.contains('~'));
    }

    #[test]
    fn overlay_adds_the_observed_path() {
        let obs = observations();
        let fc = forecast();
        let overlay = render_overlay_plot(&obs, &fc, 40, 12);
        assert!(overlay.starts_with("Actual (o~) | Predicted (-) | Prediction Interval (:)"));
        assert!(body(&overlay).contains('~'));
        assert_eq!(body(&overlay).matches('o').count(), 6);
        assert_ne!(body(&overlay), body(&render_forecast_plot(&obs, &fc, 40, 12)));
    }

    #[test]
    fn component_plot_uses_the_given_title() {
        let fc = forecast();
        let txt = render_component_plot(&fc, SUNSPOT_CYCLE, "Cycle", 30, 8).unwrap();
        assert!(txt.starts_with("Cycle: x="));
        assert_eq!(txt.lines().count(), 9);
        assert!(render_component_plot(&fc, "yearly", "Yearly", 30, 8).is_none());
    }

    #[test]
    fn components_figure_bands_the_trend() {
        let txt = render_components_figure(&forecast(), 30, 8);
        let panels: Vec<&str> = txt.lines().filter(|l| l.contains(": x=[")).collect();
        assert_eq!(panels.len(), 2);
        assert!(panels[0].starts_with("trend: "));
        assert!(panels[1].starts_with("sunspot_cycle: "));

        let trend_rows: Vec<&str> = txt.lines().skip(1).take(8).collect();
        assert!(trend_rows.iter().any(|l| l.contains(':')));
        // The cycle panel has no band.
        assert!(txt.lines().skip(10).all(|l| !l.contains(':')));
    }

    #[test]
    fn residual_plot_has_a_zero_line() {
        let residuals: Vec<ResidualRow> = [(1990, 2.0), (1991, -2.0), (1992, 1.0)]
            .into_iter()
            .map(|(y, r)| ResidualRow { ds: date(y), y: Some(r), yhat: Some(0.0), residual: Some(r) })
            .collect();
        let txt = render_residual_plot(&residuals, 20, 9);
        assert!(txt.starts_with("Residuals (actual - predicted): x="));
        assert!(body(&txt).lines().any(|l| l.contains("....")));
        assert_eq!(body(&txt).matches('o').count(), 3);
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let line = [(0.0, 100.0), (9.0, 100.0)];
        let points = [(0.0, 100.0), (9.0, 110.0)];

        let txt = render_chart("t", &[Layer::Line(&line), Layer::Points(&points)], 10, 5);
        let expected = concat!(
            "t: x=[0.0, 9.0] | y=[99.50, 110.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn reference_line_and_band() {
        let band = [(0.0, -1.0, 1.0), (9.0, -1.0, 1.0)];
        let txt = render_chart("b", &[Layer::Band(&band), Layer::HLine(0.0)], 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[2], "..........");
        assert!(rows[0].starts_with(':') && rows[0].ends_with(':'));
    }

    #[test]
    fn line_covers_trace_but_not_the_reverse() {
        let flat = [(0.0, 0.0), (9.0, 0.0)];
        let line_last = render_chart("t", &[Layer::Trace(&flat), Layer::Line(&flat)], 10, 5);
        let trace_last = render_chart("t", &[Layer::Line(&flat), Layer::Trace(&flat)], 10, 5);
        assert_eq!(body(&line_last).lines().nth(2), Some("----------"));
        assert_eq!(body(&trace_last).lines().nth(2), Some("----------"));
    }

    #[test]
    fn empty_layers_do_not_panic() {
        let txt = render_chart("empty", &[], 10, 5);
        assert_eq!(txt.lines().count(), 6);
    }
}

//! Plotters charts rendered to SVG strings for the HTML dashboard.
//!
//! Every chart shares the same frame: decimal-year x axis, 5% padding on
//! both axes, light mesh, legend in the upper left when series carry labels.
//! Charts are drawn into an in-memory buffer via `SVGBackend::with_string`,
//! so nothing touches the filesystem here.

use std::fmt::Display;
use std::ops::Range;

use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::domain::{Forecast, ForecastRow, Observation, ResidualRow, TREND};
use crate::error::AppError;
use crate::plot::{observed_points, residual_points, year_fraction};

/// Full-width figure (forecast, overlay).
pub const WIDE: (u32, u32) = (1000, 420);
/// Short strip (single components, residuals).
pub const STRIP: (u32, u32) = (1000, 260);

const FORECAST_BLUE: RGBColor = RGBColor(0, 114, 178);
const CYCLE_GREEN: RGBColor = RGBColor(0, 128, 0);
const RESIDUAL_PURPLE: RGBColor = RGBColor(128, 0, 128);

/// Model forecast: observed points, `yhat` line, interval band.
pub fn forecast_chart(observations: &[Observation], forecast: &Forecast) -> Result<String, AppError> {
    let actual = observed_points(observations);
    let yhat = column(forecast, "yhat")?;
    let band = band(forecast, |r| (r.yhat_lower, r.yhat_upper));

    let (x, y) = frame(&[&actual, &yhat], &band);
    render_svg(WIDE, |root| {
        let mut chart = cartesian(root, "Forecast", x, y)?;
        mesh(&mut chart, "ds", "y")?;

        chart
            .draw_series(std::iter::once(Polygon::new(band_outline(&band), FORECAST_BLUE.mix(0.2))))
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(yhat.iter().copied(), &FORECAST_BLUE))
            .map_err(draw_err)?;
        chart
            .draw_series(actual.iter().map(|&p| Circle::new(p, 2, BLACK.filled())))
            .map_err(draw_err)?;
        Ok(())
    })
}

/// One forecast column as a titled line chart (e.g. trend in blue, the
/// solar cycle in green).
pub fn component_chart(forecast: &Forecast, name: &str, title: &str, y_desc: &str) -> Result<String, AppError> {
    let series = column(forecast, name)?;
    let color = if name == TREND { FORECAST_BLUE } else { CYCLE_GREEN };

    let (x, y) = frame(&[&series], &[]);
    render_svg(STRIP, |root| {
        let mut chart = cartesian(root, title, x, y)?;
        mesh(&mut chart, "Date", y_desc)?;
        chart
            .draw_series(LineSeries::new(series.iter().copied(), &color))
            .map_err(draw_err)?;
        Ok(())
    })
}

/// Stacked component panels: trend with its interval band, then one panel
/// per fitted seasonality.
pub fn components_figure(forecast: &Forecast) -> Result<String, AppError> {
    let trend = column(forecast, TREND)?;
    let trend_band = band(forecast, |r| (r.trend_lower, r.trend_upper));

    let mut seasonal = Vec::with_capacity(forecast.component_names.len());
    for name in &forecast.component_names {
        seasonal.push((name.as_str(), column(forecast, name)?));
    }

    let panels = 1 + seasonal.len() as u32;
    render_svg((STRIP.0, STRIP.1 * panels), |root| {
        let areas = root.split_evenly((panels as usize, 1));

        let (x, y) = frame(&[&trend], &trend_band);
        let mut chart = cartesian(&areas[0], TREND, x, y)?;
        mesh(&mut chart, "ds", TREND)?;
        chart
            .draw_series(std::iter::once(Polygon::new(band_outline(&trend_band), FORECAST_BLUE.mix(0.2))))
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(trend.iter().copied(), &FORECAST_BLUE))
            .map_err(draw_err)?;

        for (area, (name, series)) in areas[1..].iter().zip(&seasonal) {
            let (x, y) = frame(&[series], &[]);
            let mut chart = cartesian(area, name, x, y)?;
            mesh(&mut chart, "ds", name)?;
            chart
                .draw_series(LineSeries::new(series.iter().copied(), &FORECAST_BLUE))
                .map_err(draw_err)?;
        }
        Ok(())
    })
}

/// Actual vs predicted with the prediction interval, all three labelled.
pub fn overlay_chart(observations: &[Observation], forecast: &Forecast) -> Result<String, AppError> {
    let actual = observed_points(observations);
    let yhat = column(forecast, "yhat")?;
    let band = band(forecast, |r| (r.yhat_lower, r.yhat_upper));

    let (x, y) = frame(&[&actual, &yhat], &band);
    render_svg(WIDE, |root| {
        let mut chart = cartesian(root, "Sunspots: Actual vs Predicted with Prediction Intervals", x, y)?;
        mesh(&mut chart, "Year", "Sunspot Activity")?;

        chart
            .draw_series(std::iter::once(Polygon::new(band_outline(&band), RED.mix(0.1))))
            .map_err(draw_err)?
            .label("Prediction Interval")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], RED.mix(0.1).filled()));

        chart
            .draw_series(LineSeries::new(actual.iter().copied(), &BLUE))
            .map_err(draw_err)?
            .label("Actual")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
        chart
            .draw_series(actual.iter().map(|&p| Circle::new(p, 2, BLUE.filled())))
            .map_err(draw_err)?;

        chart
            .draw_series(dashed(&yhat).map(|seg| PathElement::new(seg, RED)))
            .map_err(draw_err)?
            .label("Predicted")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 8, y)], RED));

        legend(&mut chart)
    })
}

/// Residuals over time with a dashed zero line.
pub fn residual_chart(residuals: &[ResidualRow]) -> Result<String, AppError> {
    let points = residual_points(residuals);
    // Keep zero inside the y range even when every residual has one sign.
    let zero_marker = [(f64::NAN, 0.0)];
    let (x, y) = frame(&[&points, &zero_marker], &[]);

    render_svg(STRIP, |root| {
        let mut chart = cartesian(root, "Residuals Analysis (Actual-Predicted)", x.clone(), y)?;
        mesh(&mut chart, "Year", "Residual")?;

        let zero = [(x.start, 0.0), (x.end, 0.0)];
        chart
            .draw_series(dashed(&subdivide(&zero, 80)).map(|seg| PathElement::new(seg, BLACK)))
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &RESIDUAL_PURPLE))
            .map_err(draw_err)?
            .label("Residuals")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RESIDUAL_PURPLE));
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 2, RESIDUAL_PURPLE.filled())))
            .map_err(draw_err)?;

        legend(&mut chart)
    })
}

type Chart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_svg<F>(size: (u32, u32), draw: F) -> Result<String, AppError>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> Result<(), AppError>,
{
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        draw(&root)?;
        root.present().map_err(draw_err)?;
    }
    Ok(buf)
}

fn cartesian<'a, 'b>(
    area: &'a DrawingArea<SVGBackend<'b>, Shift>,
    title: &str,
    x: Range<f64>,
    y: Range<f64>,
) -> Result<Chart<'a, 'b>, AppError> {
    ChartBuilder::on(area)
        .caption(title, ("sans-serif", 18).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(x, y)
        .map_err(draw_err)
}

fn mesh(chart: &mut Chart<'_, '_>, x_desc: &str, y_desc: &str) -> Result<(), AppError> {
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(10)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()
        .map_err(draw_err)
}

fn legend<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
) -> Result<(), AppError> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)
}

fn column(forecast: &Forecast, name: &str) -> Result<Vec<(f64, f64)>, AppError> {
    let series = forecast
        .series(name)
        .ok_or_else(|| AppError::output(format!("Forecast has no column '{name}'")))?;
    Ok(series.into_iter().map(|(ds, v)| (year_fraction(ds), v)).collect())
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

/// Closed outline of a band: upper edge left to right, lower edge back.
fn band_outline(band: &[(f64, f64, f64)]) -> Vec<(f64, f64)> {
    band.iter()
        .map(|&(x, _, hi)| (x, hi))
        .chain(band.iter().rev().map(|&(x, lo, _)| (x, lo)))
        .collect()
}

/// Every other segment of a polyline, for a dashed look.
fn dashed(points: &[(f64, f64)]) -> impl Iterator<Item = Vec<(f64, f64)>> + '_ {
    points
        .windows(2)
        .step_by(2)
        .map(|w| vec![w[0], w[1]])
}

fn subdivide(line: &[(f64, f64); 2], pieces: usize) -> Vec<(f64, f64)> {
    let [(x0, y0), (x1, y1)] = *line;
    (0..=pieces)
        .map(|i| {
            let u = i as f64 / pieces as f64;
            (x0 + u * (x1 - x0), y0 + u * (y1 - y0))
        })
        .collect()
}

/// Padded x and y ranges over point series and bands, ignoring non-finite values.
fn frame(series: &[&[(f64, f64)]], band: &[(f64, f64, f64)]) -> (Range<f64>, Range<f64>) {
    let xs = series
        .iter()
        .flat_map(|s| s.iter().map(|p| p.0))
        .chain(band.iter().map(|b| b.0));
    let ys = series
        .iter()
        .flat_map(|s| s.iter().map(|p| p.1))
        .chain(band.iter().flat_map(|b| [b.1, b.2]));
    (padded(xs), padded(ys))
}

fn padded(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return 0.0..1.0;
    }
    if max <= min {
        return (min - 0.5)..(max + 0.5);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

fn draw_err(e: impl Display) -> AppError {
    AppError::output(format!("Failed to render chart: {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;

    fn forecast() -> Forecast {
        let rows = (0..5)
            .map(|i| {
                let ds = NaiveDate::from_ymd_opt(2000 + i, 12, 31).unwrap();
                let v = i as f64;
                ForecastRow {
                    ds,
                    yhat: v,
                    yhat_lower: v - 1.0,
                    yhat_upper: v + 1.0,
                    trend: v,
                    trend_lower: v - 0.5,
                    trend_upper: v + 0.5,
                    additive_terms: 0.0,
                    components: BTreeMap::from([("sunspot_cycle".to_string(), 0.0)]),
                }
            })
            .collect();
        Forecast { rows, component_names: vec!["sunspot_cycle".to_string()] }
    }

    #[test]
    fn overlay_carries_all_legend_labels() {
        let obs = [Observation { ds: NaiveDate::from_ymd_opt(2000, 12, 31).unwrap(), y: Some(1.0) }];
        let svg = overlay_chart(&obs, &forecast()).unwrap();
        assert!(svg.starts_with("<svg"));
        for label in ["Actual", "Predicted", "Prediction Interval"] {
            assert!(svg.contains(label), "missing {label}");
        }
    }

    #[test]
    fn residual_chart_is_labelled() {
        let rows = [ResidualRow {
            ds: NaiveDate::from_ymd_opt(2000, 12, 31).unwrap(),
            y: Some(1.0),
            yhat: Some(0.5),
            residual: Some(0.5),
        }];
        let svg = residual_chart(&rows).unwrap();
        assert!(svg.contains("Residuals"));
    }

    #[test]
    fn unknown_component_is_an_output_error() {
        let err = component_chart(&forecast(), "weekly", "Weekly", "effect").unwrap_err();
        assert_eq!(err.exit_code(), AppError::OUTPUT);
    }

    #[test]
    fn components_figure_has_a_panel_per_term() {
        let svg = components_figure(&forecast()).unwrap();
        assert!(svg.contains("trend") && svg.contains("sunspot_cycle"));
    }

    #[test]
    fn flat_ranges_are_widened() {
        assert_eq!(padded([3.0, 3.0].into_iter()), 2.5..3.5);
        assert_eq!(padded(std::iter::empty()), 0.0..1.0);
    }
}

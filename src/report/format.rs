//! Terminal formatting for the report sections.

use crate::domain::{DAYS_PER_YEAR, Forecast, Observation, ResidualSummary, RunConfig, SUNSPOT_CYCLE};
use crate::fit::FittedModel;
use crate::io::ingest::DatasetStats;

/// Dashboard title, shared by the terminal and HTML front ends.
pub const TITLE: &str = "Sunspot Forecast with Preprocessed Sunspot Data";

/// Section headings, in display order (after the title).
pub const SECTION_PREVIEW: &str = "Data Preview";
pub const SECTION_FORECAST: &str = "Forecast Plot";
pub const SECTION_COMPONENTS: &str = "Forecast Components";
pub const SECTION_OVERLAY: &str = "Actual vs Predicted with Prediction Intervals";
pub const SECTION_RESIDUALS: &str = "Residual Analysis";
pub const SECTION_STATS: &str = "Residual Summary Statistics";

/// Format the run summary (dataset stats + fitted model).
pub fn format_run_summary(
    stats: &DatasetStats,
    model: &FittedModel,
    forecast: &Forecast,
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {TITLE} ===\n"));
    out.push_str(&format!("Variant: {}\n", config.variant.display_name()));
    out.push_str(&format!("Input: {}\n", config.csv_path.display()));
    out.push_str(&format!(
        "Rows: n={} (observed {}) | ds=[{}, {}] | y=[{}, {}]\n",
        stats.n_rows,
        stats.n_observed,
        stats.ds_min,
        stats.ds_max,
        fmt_opt(stats.y_min, 2),
        fmt_opt(stats.y_max, 2),
    ));

    out.push_str("\nModel:\n");
    out.push_str(&format!(
        "- trend changepoints: {}\n",
        model.trend_params().changepoints_t.len()
    ));
    let names = model.component_names();
    out.push_str(&format!(
        "- seasonalities: {}\n",
        if names.is_empty() { "(none)".to_string() } else { names.join(", ") }
    ));
    out.push_str(&format!("- in-sample RMSE: {:.3}\n", model.sigma_obs()));
    out.push_str(&format!(
        "- forecast rows: {} ({} future, {:?})\n",
        forecast.len(),
        config.periods,
        config.freq
    ));
    out.push_str(&format!(
        "- interval: {:.0}% from {} draws\n",
        config.forecast.interval_width * 100.0,
        config.forecast.uncertainty_samples
    ));

    out
}

/// Format the first rows of the data as a two-column table.
pub fn format_preview(rows: &[Observation]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>4} {:<12} {:>12}\n", "", "ds", "y"));
    out.push_str(&format!("{:->4} {:-<12} {:->12}\n", "", "", ""));
    for (i, o) in rows.iter().enumerate() {
        out.push_str(&format!("{:>4} {:<12} {:>12}\n", i, o.ds.to_string(), fmt_opt(o.y, 3)));
    }
    out
}

/// Format the residual statistics in `describe()` layout.
pub fn format_summary(summary: &ResidualSummary) -> String {
    let rows: [(&str, String); 8] = [
        ("count", format!("{:.6}", summary.count as f64)),
        ("mean", fmt_opt(summary.mean, 6)),
        ("std", fmt_opt(summary.std, 6)),
        ("min", fmt_opt(summary.min, 6)),
        ("25%", fmt_opt(summary.q25, 6)),
        ("50%", fmt_opt(summary.q50, 6)),
        ("75%", fmt_opt(summary.q75, 6)),
        ("max", fmt_opt(summary.max, 6)),
    ];

    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>14}\n", "", "residual"));
    for (label, value) in rows {
        out.push_str(&format!("{label:<6} {value:>14}\n"));
    }
    out
}

/// Heading for the solar-cycle component panel, e.g. `(11-year)`.
pub fn cycle_title(config: &RunConfig) -> String {
    let years = config
        .forecast
        .seasonalities
        .iter()
        .find(|s| s.name == SUNSPOT_CYCLE)
        .map(|s| s.period_days / DAYS_PER_YEAR);
    match years {
        Some(y) => format!("Sunspot Cycle Seasonality ({y:.0}-year)"),
        None => "Sunspot Cycle Seasonality".to_string(),
    }
}

/// A number with fixed decimals, or `NaN` for a missing value.
pub fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => "NaN".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn cycle_title_follows_the_configured_period() {
        use crate::domain::Variant;

        let mut config = RunConfig::new("unused.csv", Variant::CycleOnly);
        assert_eq!(cycle_title(&config), "Sunspot Cycle Seasonality (11-year)");
        config.forecast.seasonalities.clear();
        assert_eq!(cycle_title(&config), "Sunspot Cycle Seasonality");
    }

    #[test]
    fn preview_lists_rows_with_index() {
        let rows = [
            Observation { ds: NaiveDate::from_ymd_opt(1749, 1, 1).unwrap(), y: Some(96.7) },
            Observation { ds: NaiveDate::from_ymd_opt(1750, 1, 1).unwrap(), y: None },
        ];
        let text = format_preview(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("1749-01-01") && lines[2].ends_with("96.700"));
        assert!(lines[3].ends_with("NaN"));
    }

    #[test]
    fn summary_has_describe_rows() {
        let summary = ResidualSummary {
            count: 2,
            mean: Some(0.5),
            std: Some(0.707107),
            min: Some(0.0),
            q25: Some(0.25),
            q50: Some(0.5),
            q75: Some(0.75),
            max: Some(1.0),
        };
        let text = format_summary(&summary);
        let labels: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(labels, vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]);
        assert!(text.contains("2.000000"));
    }

    #[test]
    fn missing_numbers_render_as_nan() {
        assert_eq!(fmt_opt(None, 2), "NaN");
        assert_eq!(fmt_opt(Some(1.23456), 2), "1.23");
    }
}

//! The terminal rendition of the dashboard (`sunspot report`).

use std::fmt::Write as _;

use tracing::warn;

use crate::app::pipeline::RunOutput;
use crate::domain::{RunConfig, SUNSPOT_CYCLE, TREND, Variant};
use crate::plot;
use crate::report::{
    SECTION_COMPONENTS, SECTION_FORECAST, SECTION_OVERLAY, SECTION_PREVIEW, SECTION_RESIDUALS, SECTION_STATS,
    cycle_title, format_preview, format_run_summary, format_summary,
};

/// Run summary (with the title), then the six sections in dashboard order.
pub fn render_report(run: &RunOutput, config: &RunConfig) -> String {
    let (w, h) = (config.plot_width, config.plot_height);
    let mut out = format_run_summary(&run.dataset.stats, &run.model, &run.forecast, config);
    out.push('\n');

    section(&mut out, SECTION_PREVIEW, &format_preview(run.dataset.head(config.preview_rows)));
    section(
        &mut out,
        SECTION_FORECAST,
        &plot::render_forecast_plot(&run.dataset.observations, &run.forecast, w, h),
    );
    section(&mut out, SECTION_COMPONENTS, &components(run, config));
    section(
        &mut out,
        SECTION_OVERLAY,
        &plot::render_overlay_plot(&run.dataset.observations, &run.forecast, w, h),
    );
    section(&mut out, SECTION_RESIDUALS, &plot::render_residual_plot(&run.residuals, w, h / 2));
    section(&mut out, SECTION_STATS, &format_summary(&run.summary));
    out
}

fn components(run: &RunOutput, config: &RunConfig) -> String {
    let (w, h) = (config.plot_width, config.plot_height / 2);
    match config.variant {
        Variant::CycleOnly => {
            let panels = [(TREND, "Trend".to_string()), (SUNSPOT_CYCLE, cycle_title(config))];
            let mut out = String::new();
            for (column, title) in panels {
                match plot::render_component_plot(&run.forecast, column, &title, w, h) {
                    Some(panel) => out.push_str(&panel),
                    None => warn!(column, "no such forecast column"),
                }
            }
            out
        }
        Variant::DefaultSeasonality => plot::render_components_figure(&run.forecast, w, h),
    }
}

fn section(out: &mut String, heading: &str, body: &str) {
    let _ = writeln!(out, "--- {heading} ---");
    let _ = writeln!(out, "{body}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_forecast_on;
    use crate::report::TITLE;
    use crate::io::ingest::read_observations;

    fn run(variant: Variant) -> (RunOutput, RunConfig) {
        let mut csv = String::from("ds,y\n");
        for year in 1950..2000 {
            let phase = (year - 1950) as f64 / 11.0 * std::f64::consts::TAU;
            csv.push_str(&format!("{year}-01-01,{:.3}\n", 80.0 + 60.0 * phase.sin()));
        }
        let dataset = read_observations(csv.as_bytes()).unwrap();
        let mut config = RunConfig::new("unused.csv", variant);
        config.forecast.uncertainty_samples = 50;
        config.plot_width = 60;
        config.plot_height = 12;
        (run_forecast_on(dataset, &config).unwrap(), config)
    }

    fn heading_positions(text: &str) -> Vec<usize> {
        [
            SECTION_PREVIEW,
            SECTION_FORECAST,
            SECTION_COMPONENTS,
            SECTION_OVERLAY,
            SECTION_RESIDUALS,
            SECTION_STATS,
        ]
        .iter()
        .map(|h| text.find(&format!("--- {h} ---")).unwrap_or_else(|| panic!("missing {h}")))
        .collect()
    }

    fn components_section(text: &str) -> &str {
        let start = text.find(&format!("--- {SECTION_COMPONENTS} ---")).unwrap();
        let end = text.find(&format!("--- {SECTION_OVERLAY} ---")).unwrap();
        &text[start..end]
    }

    #[test]
    fn cycle_only_report_has_trend_and_cycle_panels() {
        let (run, config) = run(Variant::CycleOnly);
        let text = render_report(&run, &config);

        assert!(text.starts_with(&format!("=== {TITLE} ===")));
        let pos = heading_positions(&text);
        assert!(pos.windows(2).all(|w| w[0] < w[1]));

        let components = components_section(&text);
        assert!(components.contains("\nTrend: x="));
        assert!(components.contains("\nSunspot Cycle Seasonality (11-year): x="));
        assert!(!components.contains("yearly"));
    }

    #[test]
    fn default_report_stacks_banded_trend_and_every_component() {
        let (run, config) = run(Variant::DefaultSeasonality);
        let text = render_report(&run, &config);

        assert!(heading_positions(&text).windows(2).all(|w| w[0] < w[1]));

        let components = components_section(&text);
        assert!(!components.contains("Sunspot Cycle Seasonality"));
        assert!(components.contains("\ntrend: x="));
        for name in &run.forecast.component_names {
            assert!(components.contains(&format!("\n{name}: x=")), "missing panel {name}");
        }
    }

    #[test]
    fn overlay_differs_from_forecast_plot() {
        let (run, config) = run(Variant::CycleOnly);
        let text = render_report(&run, &config);

        let forecast = &text[text.find(&format!("--- {SECTION_FORECAST} ---")).unwrap()..];
        let overlay = &text[text.find(&format!("--- {SECTION_OVERLAY} ---")).unwrap()..];
        assert!(forecast.lines().nth(1).unwrap().starts_with("Forecast: actual (o)"));
        assert!(overlay.lines().nth(1).unwrap().starts_with("Actual (o~) | Predicted (-)"));
    }
}

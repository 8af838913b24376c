//! Self-contained HTML dashboard.
//!
//! One page, no external assets: charts are inline SVG from [`crate::plot::svg`],
//! tables are plain HTML. Sections always appear in the same order:
//!
//! 1. title
//! 2. data preview (first rows)
//! 3. forecast plot
//! 4. components (two charts for `cycle-only`, one stacked figure otherwise)
//! 5. actual vs predicted with prediction intervals
//! 6. residual plot
//! 7. residual summary statistics

use std::fmt::Write as _;

use tracing::debug;

use crate::app::pipeline::RunOutput;
use crate::domain::{Observation, ResidualSummary, RunConfig, SUNSPOT_CYCLE, TREND, Variant};
use crate::error::AppError;
use crate::plot::svg;
use crate::report::{
    SECTION_COMPONENTS, SECTION_FORECAST, SECTION_OVERLAY, SECTION_PREVIEW, SECTION_RESIDUALS, SECTION_STATS, TITLE,
    cycle_title, fmt_opt,
};

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:1040px;color:#222}\
h1{font-size:1.8em}h2{font-size:1.3em;border-bottom:1px solid #ddd;padding-bottom:.2em}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.25em .75em;text-align:right}\
.meta{color:#666}";

/// Render the full dashboard page.
pub fn render_dashboard(run: &RunOutput, config: &RunConfig) -> Result<String, AppError> {
    let mut page = Page::new();

    page.raw(&format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape(TITLE)
    ));
    page.raw(&format!("<h1>{}</h1>\n", escape(TITLE)));
    page.raw(&format!(
        "<p class=\"meta\">{} | {} rows | {} future periods</p>\n",
        escape(config.variant.display_name()),
        run.dataset.stats.n_rows,
        config.periods
    ));

    page.section(SECTION_PREVIEW, &preview_table(run.dataset.head(config.preview_rows)));
    page.section(SECTION_FORECAST, &svg::forecast_chart(&run.dataset.observations, &run.forecast)?);
    page.section(SECTION_COMPONENTS, &components(run, config)?);
    page.section(SECTION_OVERLAY, &svg::overlay_chart(&run.dataset.observations, &run.forecast)?);
    page.section(SECTION_RESIDUALS, &svg::residual_chart(&run.residuals)?);
    page.section(SECTION_STATS, &summary_table(&run.summary));

    page.raw("</body>\n</html>\n");
    debug!(bytes = page.html.len(), "dashboard rendered");
    Ok(page.html)
}

fn components(run: &RunOutput, config: &RunConfig) -> Result<String, AppError> {
    match config.variant {
        Variant::CycleOnly => {
            let mut out = svg::component_chart(&run.forecast, TREND, "Trend", "Trend")?;
            out.push('\n');
            out.push_str(&svg::component_chart(
                &run.forecast,
                SUNSPOT_CYCLE,
                &cycle_title(config),
                "Seasonal Effect",
            )?);
            Ok(out)
        }
        Variant::DefaultSeasonality => svg::components_figure(&run.forecast),
    }
}

fn preview_table(rows: &[Observation]) -> String {
    let mut out = String::from("<table>\n<tr><th></th><th>ds</th><th>y</th></tr>\n");
    for (i, o) in rows.iter().enumerate() {
        let _ = writeln!(out, "<tr><td>{i}</td><td>{}</td><td>{}</td></tr>", o.ds, fmt_opt(o.y, 3));
    }
    out.push_str("</table>");
    out
}

fn summary_table(summary: &ResidualSummary) -> String {
    let rows = [
        ("count", format!("{:.6}", summary.count as f64)),
        ("mean", fmt_opt(summary.mean, 6)),
        ("std", fmt_opt(summary.std, 6)),
        ("min", fmt_opt(summary.min, 6)),
        ("25%", fmt_opt(summary.q25, 6)),
        ("50%", fmt_opt(summary.q50, 6)),
        ("75%", fmt_opt(summary.q75, 6)),
        ("max", fmt_opt(summary.max, 6)),
    ];
    let mut out = String::from("<table>\n<tr><th></th><th>residual</th></tr>\n");
    for (label, value) in rows {
        let _ = writeln!(out, "<tr><th>{label}</th><td>{value}</td></tr>");
    }
    out.push_str("</table>");
    out
}

struct Page {
    html: String,
}

impl Page {
    fn new() -> Self {
        Self { html: String::new() }
    }

    fn raw(&mut self, s: &str) {
        self.html.push_str(s);
    }

    fn section(&mut self, heading: &str, body: &str) {
        let _ = write!(self.html, "<section>\n<h2>{}</h2>\n{body}\n</section>\n", escape(heading));
    }
}

/// Minimal HTML text escaping.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

//! Piecewise-linear trend.
//!
//! With changepoints `s_j` (in scaled time) and rate adjustments `δ_j`:
//!
//! ```text
//! g(t) = k·t + m + Σ_j δ_j · max(t - s_j, 0)
//! ```
//!
//! The hinge form is linear in `(m, k, δ)`, so the trend shares one design
//! matrix with the seasonal terms.

/// Number of leading trend columns before the changepoint hinges (`1`, `t`).
pub const TREND_BASE_COLS: usize = 2;

/// Pick changepoint locations from the (sorted, scaled) history times.
///
/// Changepoints sit at evenly spaced history rows within the first
/// `changepoint_range` fraction of the history, skipping the first row. The
/// count is capped so every changepoint has at least one history row before it.
pub fn changepoint_locations(t_hist: &[f64], n_changepoints: usize, changepoint_range: f64) -> Vec<f64> {
    let range = if changepoint_range.is_finite() {
        changepoint_range.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let hist_size = (t_hist.len() as f64 * range).floor() as usize;
    let n = n_changepoints.min(hist_size.saturating_sub(1));
    if n == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    let mut out: Vec<f64> = (1..=n)
        .map(|i| {
            let idx = (i as f64 * last / n as f64).round() as usize;
            t_hist[idx.min(t_hist.len() - 1)]
        })
        .collect();
    out.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
    out
}

/// Fill the trend part of a design row: `[1, t, hinge_1, …, hinge_S]`.
///
/// Writes at most `out.len()` values.
pub fn fill_trend_row(t: f64, changepoints: &[f64], out: &mut [f64]) {
    let hinges = changepoints.iter().map(|&s| (t - s).max(0.0));
    for (slot, v) in out.iter_mut().zip([1.0, t].into_iter().chain(hinges)) {
        *slot = v;
    }
}

/// Evaluate the piecewise-linear trend at scaled time `t`.
pub fn piecewise_linear(t: f64, k: f64, m: f64, changepoints: &[f64], deltas: &[f64]) -> f64 {
    let bends: f64 = changepoints
        .iter()
        .zip(deltas)
        .map(|(&s, &d)| d * (t - s).max(0.0))
        .sum();
    k * t + m + bends
}

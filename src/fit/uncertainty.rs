//! Prediction intervals by simulation.
//!
//! Each draw:
//! - extends the trend into the future with randomly placed changepoints
//!   (Poisson count at the historical changepoint rate, Laplace magnitudes with
//!   scale `mean |δ|`)
//! - adds Gaussian observation noise with the in-sample `sigma_obs`
//!
//! Draws are independent and each owns an RNG seeded from `(seed, draw index)`,
//! so the result does not depend on how rayon schedules them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Poisson};
use rayon::prelude::*;

use crate::domain::TrendParams;
use crate::error::AppError;
use crate::math::{quantile_sorted, sorted_copy};
use crate::models::piecewise_linear;

/// Inputs shared by every draw (scaled units).
#[derive(Debug, Clone, Copy)]
pub struct SimulationInput<'a> {
    pub trend: &'a TrendParams,
    pub sigma_obs: f64,
    /// Scaled time of each forecast date.
    pub t: &'a [f64],
    /// Seasonal sum of each forecast date.
    pub seasonal: &'a [f64],
    pub y_scale: f64,
}

/// Interval bounds in `y` units.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBands {
    pub yhat_lower: Vec<f64>,
    pub yhat_upper: Vec<f64>,
    pub trend_lower: Vec<f64>,
    pub trend_upper: Vec<f64>,
}

/// Simulate `samples` draws and return the `(1 ± width) / 2` quantile bands.
///
/// With `samples == 0` the bands collapse onto the point forecast.
pub fn simulate_intervals(
    input: SimulationInput<'_>,
    interval_width: f64,
    samples: usize,
    seed: u64,
) -> Result<IntervalBands, AppError> {
    let n = input.t.len();
    let trend_point: Vec<f64> = input
        .t
        .iter()
        .map(|&t| {
            piecewise_linear(t, input.trend.k, input.trend.m, &input.trend.changepoints_t, &input.trend.deltas)
                * input.y_scale
        })
        .collect();

    if samples == 0 {
        let yhat: Vec<f64> = trend_point
            .iter()
            .zip(input.seasonal)
            .map(|(tr, s)| tr + s * input.y_scale)
            .collect();
        return Ok(IntervalBands {
            yhat_lower: yhat.clone(),
            yhat_upper: yhat,
            trend_lower: trend_point.clone(),
            trend_upper: trend_point,
        });
    }

    let noise = Normal::new(0.0, input.sigma_obs.max(0.0))
        .map_err(|e| AppError::fit(format!("Invalid observation noise scale: {e}")))?;

    let draws: Vec<(Vec<f64>, Vec<f64>)> = (0..samples)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            draw_once(&input, &noise, &mut rng)
        })
        .collect::<Result<_, AppError>>()?;

    let lo_q = (1.0 - interval_width) / 2.0;
    let hi_q = (1.0 + interval_width) / 2.0;

    let mut bands = IntervalBands {
        yhat_lower: Vec::with_capacity(n),
        yhat_upper: Vec::with_capacity(n),
        trend_lower: Vec::with_capacity(n),
        trend_upper: Vec::with_capacity(n),
    };

    let mut column = Vec::with_capacity(samples);
    for j in 0..n {
        column.clear();
        column.extend(draws.iter().map(|(_, y)| y[j]));
        let ys = sorted_copy(&column);

        column.clear();
        column.extend(draws.iter().map(|(tr, _)| tr[j]));
        let ts = sorted_copy(&column);

        bands.yhat_lower.push(quantile_sorted(&ys, lo_q).unwrap_or(f64::NAN));
        bands.yhat_upper.push(quantile_sorted(&ys, hi_q).unwrap_or(f64::NAN));
        bands.trend_lower.push(quantile_sorted(&ts, lo_q).unwrap_or(f64::NAN));
        bands.trend_upper.push(quantile_sorted(&ts, hi_q).unwrap_or(f64::NAN));
    }

    Ok(bands)
}

/// One simulated path: `(trend, yhat)` in `y` units.
fn draw_once(
    input: &SimulationInput<'_>,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let (cps, deltas) = sample_future_changepoints(input.trend, input.t, rng)?;

    let mut trend = Vec::with_capacity(input.t.len());
    let mut yhat = Vec::with_capacity(input.t.len());
    for (&t, &s) in input.t.iter().zip(input.seasonal) {
        let tr = piecewise_linear(t, input.trend.k, input.trend.m, &cps, &deltas);
        trend.push(tr * input.y_scale);
        yhat.push((tr + s + noise.sample(rng)) * input.y_scale);
    }
    Ok((trend, yhat))
}

/// Historical changepoints plus randomly sampled ones beyond `t = 1`.
fn sample_future_changepoints(
    trend: &TrendParams,
    t: &[f64],
    rng: &mut StdRng,
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let mut cps = trend.changepoints_t.clone();
    let mut deltas = trend.deltas.clone();

    let t_max = t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rate = cps.len() as f64;
    if t_max.is_nan() || t_max <= 1.0 || rate == 0.0 {
        return Ok((cps, deltas));
    }

    let expected = rate * (t_max - 1.0);
    let n_new = Poisson::new(expected)
        .map_err(|e| AppError::fit(format!("Invalid changepoint rate: {e}")))?
        .sample(rng) as usize;
    if n_new == 0 {
        return Ok((cps, deltas));
    }

    let scale = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + 1e-8;
    let magnitude = Exp::new(1.0 / scale)
        .map_err(|e| AppError::fit(format!("Invalid changepoint scale: {e}")))?;

    for _ in 0..n_new {
        cps.push(rng.gen_range(1.0..t_max));
        let size: f64 = magnitude.sample(rng);
        deltas.push(if rng.gen_bool(0.5) { size } else { -size });
    }
    Ok((cps, deltas))
}

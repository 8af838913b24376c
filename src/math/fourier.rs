//! Fourier basis for periodic components.
//!
//! A seasonality of period `P` days and order `N` is represented by the `2N`
//! columns
//!
//! - `sin(2π n t / P)`, `cos(2π n t / P)` for `n = 1..=N`
//!
//! evaluated at `t` = days since 1970-01-01. Using an absolute epoch (rather
//! than the start of the history) keeps the phase of a component independent
//! of which rows were used to fit it.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

/// `num_days_from_ce()` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days between `date` and 1970-01-01 (negative before the epoch).
pub fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
}

/// Fill `out` with interleaved `sin, cos` pairs for harmonics `1..=order`
/// at time `t_days`.
///
/// Only complete pairs that fit in `out` are written; slots past `2 * order`
/// are left untouched.
pub fn fill_fourier_row(t_days: f64, period_days: f64, order: usize, out: &mut [f64]) {
    for (n, pair) in (1..=order).zip(out.chunks_exact_mut(2)) {
        let x = 2.0 * PI * n as f64 * t_days / period_days;
        pair[0] = x.sin();
        pair[1] = x.cos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fourier_row(t_days: f64, period_days: f64, order: usize) -> Vec<f64> {
        let mut out = vec![0.0; 2 * order];
        fill_fourier_row(t_days, period_days, order, &mut out);
        out
    }

    #[test]
    fn epoch_is_day_zero() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(d), 0.0);
        let d = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(days_since_epoch(d), -1.0);
    }

    #[test]
    fn fourier_terms_repeat_every_period() {
        let period = 11.0 * 365.25;
        let a = fourier_row(1234.0, period, 5);
        let b = fourier_row(1234.0 + period, period, 5);
        assert_eq!(a.len(), 10);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn fourier_terms_at_zero() {
        let row = fourier_row(0.0, 7.0, 2);
        assert_eq!(row, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn short_buffer_gets_only_complete_pairs() {
        let mut out = [9.0; 3];
        fill_fourier_row(0.0, 7.0, 5, &mut out);
        assert_eq!(out, [0.0, 1.0, 9.0]);
    }
}

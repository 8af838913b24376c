//! Penalised least squares solver.
//!
//! The additive model is linear in its coefficients once changepoints and
//! Fourier periods are fixed, so fitting reduces to:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ_j (β_j / s_j)^2
//! ```
//!
//! where `s_j` is the prior scale of coefficient `j` (`None` = unpenalised).
//!
//! Implementation choices:
//! - The penalty is applied by appending one pseudo-observation row per
//!   penalised coefficient (`1 / s_j` on the diagonal, target 0). This keeps a
//!   single ordinary least squares solve.
//! - We use SVD so the solve stays robust for tall matrices and for nearly
//!   collinear Fourier columns (e.g. yearly terms sampled once a year).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve a ridge-penalised least squares problem.
///
/// `prior_scales[j]` controls the penalty on column `j`; `None` leaves the
/// column unpenalised. Non-positive or non-finite scales are treated as
/// unpenalised. Returns `None` unless there is exactly one scale per column.
pub fn solve_penalized(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    prior_scales: &[Option<f64>],
) -> Option<DVector<f64>> {
    if prior_scales.len() != x.ncols() {
        return None;
    }

    let penalised: Vec<(usize, f64)> = prior_scales
        .iter()
        .enumerate()
        .filter_map(|(j, s)| match s {
            Some(s) if s.is_finite() && *s > 0.0 => Some((j, 1.0 / s)),
            _ => None,
        })
        .collect();

    if penalised.is_empty() {
        return solve_least_squares(x, y);
    }

    let n = x.nrows();
    let p = x.ncols();
    let mut xa = DMatrix::<f64>::zeros(n + penalised.len(), p);
    let mut ya = DVector::<f64>::zeros(n + penalised.len());

    xa.rows_mut(0, n).copy_from(x);
    ya.rows_mut(0, n).copy_from(y);
    for (row, &(j, weight)) in penalised.iter().enumerate() {
        xa[(n + row, j)] = weight;
    }

    solve_least_squares(&xa, &ya)
}

//! Least squares solvers.
//!
//! Both the resolution polynomial and the line-profile optimizer reduce to small
//! problems of the form:
//!
//! ```text
//! minimize Σ (w_i (y_i - x_i^T β))^2
//! ```
//!
//! We scale each row by `w_i` and solve the resulting ordinary least squares system
//! with SVD, which stays robust for tall and slightly rank-deficient designs.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.nrows() < x.ncols() {
        return None;
    }
    // SVD does not terminate reliably on NaN or infinite entries.
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve with per-row weights multiplying the residuals.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &[f64],
) -> Option<DVector<f64>> {
    if w.len() != x.nrows() || w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }
    let mut xw = x.clone();
    let mut yw = y.clone();
    for (i, &wi) in w.iter().enumerate() {
        xw.row_mut(i).scale_mut(wi);
        yw[i] *= wi;
    }
    solve_least_squares(&xw, &yw)
}

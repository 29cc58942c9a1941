//! Weighted polynomial fitting and evaluation.
//!
//! Wavelengths sit far from zero (thousands of Å), so raw powers quickly lose
//! precision for degrees above 2. We fit over `u = (x - centre) / scale`, which maps
//! the data span onto `[-1, 1]`.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_weighted_least_squares;

/// A fitted polynomial over a normalised abscissa.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyFit {
    pub centre: f64,
    pub scale: f64,
    /// Ascending order: `c0 + c1 u + c2 u^2 + ...`.
    pub coefficients: Vec<f64>,
}

/// Evaluate an ascending-order polynomial with Horner's method.
pub fn polyval(coefficients: &[f64], u: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * u + c)
}

/// Least squares polynomial of `degree` through `(x, y)`, with residual weights `w`.
///
/// Returns `None` when there are fewer than `degree + 1` points, inputs are not
/// finite, or the system cannot be solved.
pub fn polyfit_weighted(x: &[f64], y: &[f64], w: &[f64], degree: usize) -> Option<PolyFit> {
    let n = x.len();
    if n != y.len() || n != w.len() || n < degree + 1 {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }

    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let centre = 0.5 * (lo + hi);
    let half_span = 0.5 * (hi - lo);
    let scale = if half_span > 0.0 { half_span } else { 1.0 };

    let p = degree + 1;
    let mut design = DMatrix::<f64>::zeros(n, p);
    for (i, &xi) in x.iter().enumerate() {
        let u = (xi - centre) / scale;
        let mut power = 1.0;
        for j in 0..p {
            design[(i, j)] = power;
            power *= u;
        }
    }
    let obs = DVector::from_column_slice(y);

    let beta = solve_weighted_least_squares(&design, &obs, w)?;
    Some(PolyFit {
        centre,
        scale,
        coefficients: beta.iter().copied().collect(),
    })
}

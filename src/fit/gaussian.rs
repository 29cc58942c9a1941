//! Single-line profile fitting.
//!
//! The default [`LineFitter`] models a sky line inside `[centre - dX, centre + dX]` as
//!
//! ```text
//! f(x) = a exp(-(x - mu)^2 / (2 s^2)) + c0 + c1 (x - centre)
//! ```
//!
//! and minimises the error-weighted chi-square with Levenberg–Marquardt. Each step
//! solves the damped system as an augmented least squares problem, reusing the SVD
//! solver from `math::ols`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitOutcome, LineFit, LineFitFailure, Spectrum, SpectrumWindow};
use crate::math::solve_least_squares;

/// `FWHM = FWHM_PER_SIGMA * sigma` for a Gaussian.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

const N_PARAMS: usize = 5;

/// Fewest window samples for which a fit is attempted.
pub const MIN_WINDOW_SAMPLES: usize = N_PARAMS + 1;

/// Per-line fit capability. Implementations never fail hard: anything that is not
/// a usable line width is a [`FitOutcome::Failure`].
pub trait LineFitter {
    fn fit_line(&self, spectrum: &Spectrum, center: f64, half_width: f64) -> FitOutcome;
}

impl<F> LineFitter for F
where
    F: Fn(&Spectrum, f64, f64) -> FitOutcome,
{
    fn fit_line(&self, spectrum: &Spectrum, center: f64, half_width: f64) -> FitOutcome {
        self(spectrum, center, half_width)
    }
}

/// Gaussian plus linear background, fitted with Levenberg–Marquardt.
#[derive(Debug, Clone)]
pub struct GaussianLineFitter {
    pub max_iters: usize,
    /// Relative chi-square improvement below which the fit is converged.
    pub tolerance: f64,
}

impl Default for GaussianLineFitter {
    fn default() -> Self {
        Self {
            max_iters: 200,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Params {
    amp: f64,
    mu: f64,
    sigma: f64,
    c0: f64,
    c1: f64,
}

impl Params {
    fn from_vec(v: &DVector<f64>) -> Self {
        Self {
            amp: v[0],
            mu: v[1],
            sigma: v[2],
            c0: v[3],
            c1: v[4],
        }
    }

    fn to_vec(self) -> DVector<f64> {
        DVector::from_column_slice(&[self.amp, self.mu, self.sigma, self.c0, self.c1])
    }

    fn eval(&self, x: f64, x_ref: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        self.amp * (-0.5 * z * z).exp() + self.c0 + self.c1 * (x - x_ref)
    }
}

impl LineFitter for GaussianLineFitter {
    fn fit_line(&self, spectrum: &Spectrum, center: f64, half_width: f64) -> FitOutcome {
        let lo = center - half_width;
        let hi = center + half_width;
        let window = spectrum.window(lo, hi);
        if window.len() < MIN_WINDOW_SAMPLES {
            return FitOutcome::Failure(LineFitFailure::InsufficientData {
                samples: window.len(),
            });
        }

        // Weights are 1 / e; a zero or non-finite uncertainty has no usable weight.
        if window.e.iter().any(|&e| !(e.is_finite() && e > 0.0)) {
            tracing::debug!(center, "window holds a non-positive uncertainty");
            return FitOutcome::Failure(LineFitFailure::NonPhysical);
        }

        let Some(start) = initial_guess(&window) else {
            return FitOutcome::Failure(LineFitFailure::NonPhysical);
        };

        let (best, cov) = match self.optimise(&window, center, start) {
            Ok(r) => r,
            Err(failure) => return FitOutcome::Failure(failure),
        };

        let sigma = best.sigma.abs();
        let sigma_var = cov[(2, 2)];
        let physical = best.amp > 0.0
            && sigma > 0.0
            && sigma < 2.0 * half_width
            && best.mu >= lo
            && best.mu <= hi
            && sigma_var.is_finite()
            && sigma_var >= 0.0;
        if !physical {
            return FitOutcome::Failure(LineFitFailure::NonPhysical);
        }

        let profile = window.x.iter().map(|&x| (x, best.eval(x, center))).collect();
        FitOutcome::Success(LineFit {
            center: best.mu,
            fwhm: FWHM_PER_SIGMA * sigma,
            fwhm_err: FWHM_PER_SIGMA * sigma_var.sqrt(),
            profile,
        })
    }
}

impl GaussianLineFitter {
    fn optimise(
        &self,
        w: &SpectrumWindow<'_>,
        x_ref: f64,
        start: Params,
    ) -> Result<(Params, DMatrix<f64>), LineFitFailure> {
        let n = w.len();
        let mut p = start;
        let mut chi2 = chi_square(w, x_ref, &p);
        let mut lambda = 1e-3;
        let mut converged = false;

        for _ in 0..self.max_iters {
            let (jac, resid) = weighted_jacobian(w, x_ref, &p);
            if !all_finite(jac.iter().chain(resid.iter())) {
                return Err(LineFitFailure::NoConvergence);
            }
            let jtj = jac.transpose() * &jac;

            // Augmented system [J; sqrt(lambda) D] delta = [r; 0].
            let mut aug = DMatrix::<f64>::zeros(n + N_PARAMS, N_PARAMS);
            aug.view_mut((0, 0), (n, N_PARAMS)).copy_from(&jac);
            for j in 0..N_PARAMS {
                aug[(n + j, j)] = (lambda * jtj[(j, j)].max(1e-12)).sqrt();
            }
            let mut rhs = DVector::<f64>::zeros(n + N_PARAMS);
            rhs.rows_mut(0, n).copy_from(&resid);

            let Some(delta) = solve_least_squares(&aug, &rhs) else {
                return Err(LineFitFailure::NoConvergence);
            };

            let trial = Params::from_vec(&(p.to_vec() + &delta));
            let trial_chi2 = if trial.sigma != 0.0 {
                chi_square(w, x_ref, &trial)
            } else {
                f64::INFINITY
            };

            if trial_chi2.is_finite() && trial_chi2 < chi2 {
                let improvement = (chi2 - trial_chi2) / chi2.max(f64::MIN_POSITIVE);
                p = trial;
                chi2 = trial_chi2;
                lambda = (lambda / 10.0).max(1e-12);
                if improvement < self.tolerance {
                    converged = true;
                    break;
                }
            } else {
                lambda *= 10.0;
                // No damping yields a better point: we are at the minimum.
                if lambda > 1e12 {
                    converged = true;
                    break;
                }
            }
        }

        if !converged {
            return Err(LineFitFailure::NoConvergence);
        }

        let (jac, _) = weighted_jacobian(w, x_ref, &p);
        if !all_finite(jac.iter()) {
            return Err(LineFitFailure::NonPhysical);
        }
        let Some(inv) = (jac.transpose() * &jac).try_inverse() else {
            return Err(LineFitFailure::NonPhysical);
        };
        let dof = n.saturating_sub(N_PARAMS).max(1);
        let reduced = chi2 / dof as f64;
        Ok((p, inv * reduced))
    }
}

fn initial_guess(w: &SpectrumWindow<'_>) -> Option<Params> {
    if w.is_empty() {
        return None;
    }
    let (imax, &ymax) = w
        .y
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    let base = w.y.iter().copied().fold(f64::INFINITY, f64::min);
    let amp = ymax - base;
    if !(amp > 0.0) {
        return None;
    }

    let spacing = (w.x[w.len() - 1] - w.x[0]) / (w.len() - 1) as f64;
    let above_half = w.y.iter().filter(|&&v| v - base > 0.5 * amp).count();
    let sigma = (above_half as f64 * spacing / FWHM_PER_SIGMA).max(spacing);

    Some(Params {
        amp,
        mu: w.x[imax],
        sigma,
        c0: base,
        c1: 0.0,
    })
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}

fn chi_square(w: &SpectrumWindow<'_>, x_ref: f64, p: &Params) -> f64 {
    w.x.iter()
        .zip(w.y)
        .zip(w.e)
        .map(|((&x, &y), &e)| {
            let r = (y - p.eval(x, x_ref)) / e;
            r * r
        })
        .sum()
}

/// Error-weighted Jacobian and residual vector.
fn weighted_jacobian(w: &SpectrumWindow<'_>, x_ref: f64, p: &Params) -> (DMatrix<f64>, DVector<f64>) {
    let n = w.len();
    let mut jac = DMatrix::<f64>::zeros(n, N_PARAMS);
    let mut resid = DVector::<f64>::zeros(n);
    for i in 0..n {
        let x = w.x[i];
        let inv_e = 1.0 / w.e[i];
        let z = (x - p.mu) / p.sigma;
        let g = (-0.5 * z * z).exp();

        jac[(i, 0)] = g * inv_e;
        jac[(i, 1)] = p.amp * g * z / p.sigma * inv_e;
        jac[(i, 2)] = p.amp * g * z * z / p.sigma * inv_e;
        jac[(i, 3)] = inv_e;
        jac[(i, 4)] = (x - x_ref) * inv_e;
        resid[i] = (w.y[i] - p.eval(x, x_ref)) * inv_e;
    }
    (jac, resid)
}

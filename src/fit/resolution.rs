//! Resolution model pipeline: per-line fits → weighted polynomial → queries.
//!
//! Per-line fits are best-effort: a failed line is dropped from the aggregate fit
//! and never aborts it. The polynomial is only fitted when at least `degree + 1`
//! lines survive.

use crate::domain::{FitOutcome, LineList, LineOutcome, ResolutionModel, Spectrum};
use crate::error::CalibError;
use crate::fit::LineFitter;
use crate::math::polyfit_weighted;

/// A surviving line used in the polynomial fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub wavelength: f64,
    pub fwhm: f64,
    pub fwhm_err: f64,
}

/// Everything produced by one `run-fit`.
#[derive(Debug, Clone)]
pub struct ResolutionFit {
    pub half_width: f64,
    /// Same length and order as the line list.
    pub outcomes: Vec<LineOutcome>,
    pub points: Vec<FitPoint>,
    pub model: ResolutionModel,
    /// RMS of the weighted residuals `(fwhm - model) / fwhm_err`.
    pub weighted_rms: f64,
}

/// Result of evaluating the model at one wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolation {
    pub wavelength: f64,
    pub resolution: f64,
    pub resolving_power: f64,
}

/// Fit every line in `lines` with `fitter`, preserving order.
pub fn fit_lines(
    spectrum: &Spectrum,
    lines: &LineList,
    half_width: f64,
    fitter: &dyn LineFitter,
) -> Vec<LineOutcome> {
    lines
        .values()
        .iter()
        .map(|&wavelength| {
            let outcome = fitter.fit_line(spectrum, wavelength, half_width);
            if let FitOutcome::Failure(reason) = &outcome {
                tracing::debug!(wavelength, %reason, "line fit discarded");
            }
            LineOutcome { wavelength, outcome }
        })
        .collect()
}

/// Successful outcomes with a usable uncertainty.
pub fn surviving_points(outcomes: &[LineOutcome]) -> Vec<FitPoint> {
    outcomes
        .iter()
        .filter_map(|o| {
            let fit = o.outcome.success()?;
            let usable = fit.fwhm.is_finite() && fit.fwhm_err.is_finite() && fit.fwhm_err > 0.0;
            if !usable {
                tracing::debug!(wavelength = o.wavelength, "line has no usable uncertainty");
                return None;
            }
            Some(FitPoint {
                wavelength: o.wavelength,
                fwhm: fit.fwhm,
                fwhm_err: fit.fwhm_err,
            })
        })
        .collect()
}

/// Fit the weighted polynomial through `points` (weights `1 / fwhm_err`).
pub fn fit_model(points: &[FitPoint], degree: usize) -> Result<ResolutionModel, CalibError> {
    // Repeated wavelengths add no constraint on the shape.
    let required = degree + 1;
    let distinct = distinct_wavelengths(points);
    if distinct < required {
        return Err(CalibError::InsufficientData {
            successes: distinct,
            required,
            degree,
        });
    }

    let x: Vec<f64> = points.iter().map(|p| p.wavelength).collect();
    let y: Vec<f64> = points.iter().map(|p| p.fwhm).collect();
    let w: Vec<f64> = points.iter().map(|p| 1.0 / p.fwhm_err).collect();

    let poly = polyfit_weighted(&x, &y, &w, degree).ok_or(CalibError::SingularModel {
        degree,
        points: points.len(),
    })?;

    Ok(ResolutionModel {
        degree,
        centre: poly.centre,
        scale: poly.scale,
        coefficients: poly.coefficients,
    })
}

fn distinct_wavelengths(points: &[FitPoint]) -> usize {
    let mut xs: Vec<f64> = points.iter().map(|p| p.wavelength).collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    xs.len()
}

/// Run the full pipeline for the current session inputs.
pub fn fit(
    spectrum: &Spectrum,
    lines: &LineList,
    half_width: f64,
    degree: usize,
    fitter: &dyn LineFitter,
) -> Result<ResolutionFit, CalibError> {
    tracing::info!(lines = lines.len(), half_width, degree, "fitting resolution model");

    let outcomes = fit_lines(spectrum, lines, half_width, fitter);
    let points = surviving_points(&outcomes);
    let model = fit_model(&points, degree)?;

    let weighted_rms = if points.is_empty() {
        0.0
    } else {
        let ss: f64 = points
            .iter()
            .map(|p| {
                let r = (p.fwhm - model.eval(p.wavelength)) / p.fwhm_err;
                r * r
            })
            .sum();
        (ss / points.len() as f64).sqrt()
    };

    tracing::info!(
        used = points.len(),
        discarded = outcomes.len() - points.len(),
        weighted_rms,
        "resolution model fitted"
    );

    Ok(ResolutionFit {
        half_width,
        outcomes,
        points,
        model,
        weighted_rms,
    })
}

/// Evaluate `model` at `wavelength`; wavelengths outside the spectrum are rejected.
pub fn interpolate(
    model: &ResolutionModel,
    spectrum: &Spectrum,
    wavelength: f64,
) -> Result<Interpolation, CalibError> {
    if !spectrum.contains(wavelength) {
        let (min, max) = spectrum.domain();
        return Err(CalibError::OutOfDomain { wavelength, min, max });
    }
    let resolution = model.eval(wavelength);
    Ok(Interpolation {
        wavelength,
        resolution,
        resolving_power: wavelength / resolution,
    })
}

//! Plotting collaborator interface and figure construction.
//!
//! Figures are plain data (series, error-bar points, overlays). Building them here
//! keeps the renderer focused on drawing and lets the session be tested with a
//! stub [`Plotter`] that only records what it was asked to show.

use crate::domain::Spectrum;
use crate::error::AppError;
use crate::fit::ResolutionFit;

/// Number of samples used to draw the resolution polynomial.
const CURVE_SAMPLES: usize = 200;

/// Shows figures; each call blocks until the view is closed.
pub trait Plotter {
    fn render(&mut self, figure: &Figure) -> Result<(), AppError>;
}

/// Interactive line picking; blocks until the view is closed.
pub trait PointPicker {
    /// Returns the wavelengths picked during this view, in pick order.
    fn pick_points(&mut self, spectrum: &Spectrum, existing: &[f64]) -> Result<Vec<f64>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Vertical marker lines at the given wavelengths.
    Markers(Vec<f64>),
    /// A poly-line drawn over the primary series.
    Curve(Vec<(f64, f64)>),
}

/// A scatter point with a symmetric vertical error bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPoint {
    pub x: f64,
    pub y: f64,
    pub err: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Primary series (drawn as a line).
    pub series: Vec<(f64, f64)>,
    pub points: Vec<ErrorPoint>,
    pub overlays: Vec<Overlay>,
}

impl Figure {
    /// The spectrum flux against wavelength, with `overlays` on top.
    pub fn spectrum(spectrum: &Spectrum, overlays: Vec<Overlay>) -> Self {
        Self {
            title: "Sky spectrum".to_string(),
            x_label: "wavelength [Å]".to_string(),
            y_label: "flux".to_string(),
            series: spectrum.x().iter().copied().zip(spectrum.y().iter().copied()).collect(),
            points: Vec::new(),
            overlays,
        }
    }

    /// Full x range covered by the series, points and curves.
    pub fn x_bounds(&self) -> Option<[f64; 2]> {
        let xs = self
            .series
            .iter()
            .map(|p| p.0)
            .chain(self.points.iter().map(|p| p.x))
            .chain(self.overlays.iter().flat_map(|o| match o {
                Overlay::Curve(c) => c.iter().map(|p| p.0).collect::<Vec<_>>(),
                Overlay::Markers(_) => Vec::new(),
            }));
        finite_bounds(xs)
    }

    /// y range of everything drawn inside `[x0, x1]`, padded by 5%.
    pub fn y_bounds_within(&self, x0: f64, x1: f64) -> [f64; 2] {
        let inside = |x: f64| x >= x0 && x <= x1;
        let mut ys: Vec<f64> = self
            .series
            .iter()
            .filter(|p| inside(p.0))
            .map(|p| p.1)
            .collect();
        for p in self.points.iter().filter(|p| inside(p.x)) {
            ys.push(p.y - p.err);
            ys.push(p.y + p.err);
        }
        for o in &self.overlays {
            if let Overlay::Curve(c) = o {
                ys.extend(c.iter().filter(|p| inside(p.0)).map(|p| p.1));
            }
        }

        let [mut lo, mut hi] = finite_bounds(ys.into_iter()).unwrap_or([0.0, 1.0]);
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }
        let pad = ((hi - lo) * 0.05).max(1e-12);
        [lo - pad, hi + pad]
    }
}

/// Spectrum with every successful line profile overlaid and line markers.
pub fn profiles_figure(spectrum: &Spectrum, run: &ResolutionFit) -> Figure {
    let mut overlays = vec![Overlay::Markers(run.outcomes.iter().map(|o| o.wavelength).collect())];
    overlays.extend(
        run.outcomes
            .iter()
            .filter_map(|o| o.outcome.success())
            .map(|fit| Overlay::Curve(fit.profile.clone())),
    );
    let mut figure = Figure::spectrum(spectrum, overlays);
    figure.title = "Line profile fits".to_string();
    figure
}

/// Per-line FWHM with error bars and the fitted resolution polynomial.
pub fn resolution_figure(spectrum: &Spectrum, run: &ResolutionFit) -> Figure {
    let (lo, hi) = spectrum.domain();
    let curve = (0..CURVE_SAMPLES)
        .map(|i| {
            let x = lo + (hi - lo) * i as f64 / (CURVE_SAMPLES - 1) as f64;
            (x, run.model.eval(x))
        })
        .collect();

    Figure {
        title: format!("Resolution model (degree {})", run.model.degree),
        x_label: "wavelength [Å]".to_string(),
        y_label: "Gaussian FWHM [Å]".to_string(),
        series: Vec::new(),
        points: run
            .points
            .iter()
            .map(|p| ErrorPoint {
                x: p.wavelength,
                y: p.fwhm,
                err: p.fwhm_err,
            })
            .collect(),
        overlays: vec![Overlay::Curve(curve)],
    }
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo <= hi).then_some([lo, hi])
}

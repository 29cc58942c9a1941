//! Shared domain types.
//!
//! - the sky [`Spectrum`] (sorted samples with uncertainties)
//! - per-line fit outcomes ([`FitOutcome`], [`LineFit`])
//! - the fitted [`ResolutionModel`]
//! - session configuration ([`SessionConfig`], [`HalfWidth`])

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CalibError;
use crate::math::polyval;

/// Largest accepted half-width of the per-line fit window (wavelength units).
pub const MAX_HALF_WIDTH: f64 = 100.0;

/// Largest accepted polynomial degree for the resolution model.
pub const MAX_DEGREE: usize = 6;

/// Auto half-width = this many mean sample spacings.
pub const AUTO_HALF_WIDTH_SPACINGS: f64 = 6.0;

/// Default file used to persist the line list.
pub const DEFAULT_LINES_FILE: &str = "skyline_table.dat";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectrumError {
    #[error("a spectrum needs at least two samples (got {0})")]
    TooFewSamples(usize),
    #[error("column lengths differ (x={x}, y={y}, e={e})")]
    LengthMismatch { x: usize, y: usize, e: usize },
    #[error("non-finite value in sample {0}")]
    NonFinite(usize),
}

/// A sky spectrum: samples sorted ascending by wavelength.
#[derive(Debug, Clone)]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
    e: Vec<f64>,
    source: Option<PathBuf>,
}

/// Borrowed view over the samples inside a wavelength interval.
#[derive(Debug, Clone, Copy)]
pub struct SpectrumWindow<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub e: &'a [f64],
}

impl<'a> SpectrumWindow<'a> {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

impl Spectrum {
    /// Build a spectrum from parallel arrays. Samples are sorted by wavelength.
    pub fn new(x: Vec<f64>, y: Vec<f64>, e: Vec<f64>) -> Result<Self, SpectrumError> {
        if x.len() != y.len() || x.len() != e.len() {
            return Err(SpectrumError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                e: e.len(),
            });
        }
        if x.len() < 2 {
            return Err(SpectrumError::TooFewSamples(x.len()));
        }
        if let Some(i) = (0..x.len()).find(|&i| !(x[i].is_finite() && y[i].is_finite() && e[i].is_finite())) {
            return Err(SpectrumError::NonFinite(i));
        }

        let already_sorted = x.windows(2).all(|w| w[0] <= w[1]);
        if already_sorted {
            return Ok(Self { x, y, e, source: None });
        }

        let mut idx: Vec<usize> = (0..x.len()).collect();
        idx.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
        Ok(Self {
            x: idx.iter().map(|&i| x[i]).collect(),
            y: idx.iter().map(|&i| y[i]).collect(),
            e: idx.iter().map(|&i| e[i]).collect(),
            source: None,
        })
    }

    /// Attach the file the spectrum was read from.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn e(&self) -> &[f64] {
        &self.e
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Sampled wavelength range `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Whether `wavelength` lies inside the sampled domain (inclusive).
    pub fn contains(&self, wavelength: f64) -> bool {
        let (lo, hi) = self.domain();
        wavelength >= lo && wavelength <= hi
    }

    pub fn mean_spacing(&self) -> f64 {
        let (lo, hi) = self.domain();
        (hi - lo) / (self.x.len() - 1) as f64
    }

    /// Samples with `lo <= x <= hi`.
    pub fn window(&self, lo: f64, hi: f64) -> SpectrumWindow<'_> {
        let start = self.x.partition_point(|&v| v < lo);
        let end = self.x.partition_point(|&v| v <= hi).max(start);
        SpectrumWindow {
            x: &self.x[start..end],
            y: &self.y[start..end],
            e: &self.e[start..end],
        }
    }
}

/// Why a single-line profile fit was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFitFailure {
    /// The window holds fewer samples than the profile has parameters.
    InsufficientData { samples: usize },
    /// The optimizer did not converge within its iteration budget.
    NoConvergence,
    /// The optimum is not an emission line (non-positive amplitude/width, centre
    /// outside the window, or a singular covariance).
    NonPhysical,
}

impl std::fmt::Display for LineFitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineFitFailure::InsufficientData { samples } => {
                write!(f, "insufficient data ({samples} samples)")
            }
            LineFitFailure::NoConvergence => write!(f, "no convergence"),
            LineFitFailure::NonPhysical => write!(f, "non-physical profile"),
        }
    }
}

/// A successful single-line fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFit {
    /// Fitted line centre.
    pub center: f64,
    pub fwhm: f64,
    pub fwhm_err: f64,
    /// Fitted model sampled over the fit window, for plotting.
    pub profile: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Success(LineFit),
    Failure(LineFitFailure),
}

impl FitOutcome {
    pub fn success(&self) -> Option<&LineFit> {
        match self {
            FitOutcome::Success(fit) => Some(fit),
            FitOutcome::Failure(_) => None,
        }
    }
}

/// Outcome for one requested line wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOutcome {
    pub wavelength: f64,
    pub outcome: FitOutcome,
}

/// Weighted polynomial mapping wavelength to expected FWHM.
///
/// Coefficients are in ascending order over the normalised abscissa
/// `u = (wavelength - centre) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionModel {
    pub degree: usize,
    pub centre: f64,
    pub scale: f64,
    pub coefficients: Vec<f64>,
}

impl ResolutionModel {
    /// Evaluate the expected FWHM at `wavelength`.
    pub fn eval(&self, wavelength: f64) -> f64 {
        polyval(&self.coefficients, (wavelength - self.centre) / self.scale)
    }
}

/// How the flux-variance mode treats a non-positive minimum variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VariancePolicy {
    /// A zero or negative minimum variance makes the spectrum unusable.
    RejectNonPositive,
    /// Accept it; the derived uncertainty is floored at `f64::EPSILON`.
    Allow,
}

/// Half-width of the per-line fit window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HalfWidth {
    /// Not set yet; resolved from the spectrum's sampling on first use.
    Auto,
    /// Resolved from the current spectrum; reverts to `Auto` when it is replaced.
    Derived(f64),
    /// Chosen by the user.
    Fixed(f64),
}

impl HalfWidth {
    /// Interpret a startup value: absent or negative means auto.
    pub fn from_cli(value: Option<f64>) -> Result<Self, CalibError> {
        match value {
            None => Ok(HalfWidth::Auto),
            Some(v) if v < 0.0 => Ok(HalfWidth::Auto),
            Some(v) => validate_half_width(v).map(HalfWidth::Fixed),
        }
    }

    /// The current value, if one has been chosen or derived.
    pub fn value(self) -> Option<f64> {
        match self {
            HalfWidth::Auto => None,
            HalfWidth::Derived(v) | HalfWidth::Fixed(v) => Some(v),
        }
    }

    /// Concrete half-width for `spectrum`.
    pub fn resolve(self, spectrum: &Spectrum) -> f64 {
        match self {
            HalfWidth::Fixed(v) | HalfWidth::Derived(v) => v,
            HalfWidth::Auto => {
                let derived = AUTO_HALF_WIDTH_SPACINGS * spectrum.mean_spacing();
                if derived > MAX_HALF_WIDTH {
                    tracing::warn!(derived, cap = MAX_HALF_WIDTH, "auto half-width capped");
                    MAX_HALF_WIDTH
                } else {
                    derived
                }
            }
        }
    }
}

impl std::fmt::Display for HalfWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HalfWidth::Auto => write!(f, "auto"),
            HalfWidth::Derived(v) => write!(f, "{v} (auto)"),
            HalfWidth::Fixed(v) => write!(f, "{v}"),
        }
    }
}

/// Accept `0 < dx <= MAX_HALF_WIDTH`.
pub fn validate_half_width(dx: f64) -> Result<f64, CalibError> {
    if dx.is_finite() && dx > 0.0 && dx <= MAX_HALF_WIDTH {
        Ok(dx)
    } else {
        Err(CalibError::InvalidConfig(format!(
            "dX must be > 0 and <= {MAX_HALF_WIDTH} (got {dx})"
        )))
    }
}

/// Accept `0 <= degree <= MAX_DEGREE`.
pub fn validate_degree(degree: i64) -> Result<usize, CalibError> {
    if (0..=MAX_DEGREE as i64).contains(&degree) {
        Ok(degree as usize)
    } else {
        Err(CalibError::InvalidConfig(format!(
            "degree must be between 0 and {MAX_DEGREE} (got {degree})"
        )))
    }
}

/// Session configuration derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub half_width: HalfWidth,
    pub degree: usize,
    pub lines_file: PathBuf,
    pub use_variance: bool,
    pub variance_policy: VariancePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            half_width: HalfWidth::Auto,
            degree: 1,
            lines_file: PathBuf::from(DEFAULT_LINES_FILE),
            use_variance: false,
            variance_policy: VariancePolicy::RejectNonPositive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, x0: f64, dx: f64) -> Spectrum {
        let x: Vec<f64> = (0..n).map(|i| x0 + dx * i as f64).collect();
        Spectrum::new(x, vec![1.0; n], vec![0.1; n]).unwrap()
    }

    #[test]
    fn spectrum_sorts_samples() {
        let s = Spectrum::new(vec![3.0, 1.0, 2.0], vec![30.0, 10.0, 20.0], vec![0.3, 0.1, 0.2]).unwrap();
        assert_eq!(s.x(), &[1.0, 2.0, 3.0]);
        assert_eq!(s.y(), &[10.0, 20.0, 30.0]);
        assert_eq!(s.e(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn spectrum_rejects_bad_input() {
        assert_eq!(
            Spectrum::new(vec![1.0], vec![1.0], vec![1.0]).unwrap_err(),
            SpectrumError::TooFewSamples(1)
        );
        assert!(matches!(
            Spectrum::new(vec![1.0, 2.0], vec![1.0], vec![1.0, 1.0]),
            Err(SpectrumError::LengthMismatch { .. })
        ));
        assert_eq!(
            Spectrum::new(vec![1.0, f64::NAN], vec![1.0, 1.0], vec![1.0, 1.0]).unwrap_err(),
            SpectrumError::NonFinite(1)
        );
    }

    #[test]
    fn domain_contains_and_window() {
        let s = ramp(11, 5000.0, 400.0);
        assert_eq!(s.domain(), (5000.0, 9000.0));
        assert!(s.contains(5000.0));
        assert!(s.contains(9000.0));
        assert!(!s.contains(9500.0));
        assert!(!s.contains(4999.9));
        assert!((s.mean_spacing() - 400.0).abs() < 1e-12);

        let w = s.window(5700.0, 6600.0);
        assert_eq!(w.x, &[5800.0, 6200.0, 6600.0]);
        assert!(s.window(5100.0, 5200.0).is_empty());
    }

    #[test]
    fn half_width_validation_bounds() {
        assert!(validate_half_width(0.0).is_err());
        assert!(validate_half_width(-1.0).is_err());
        assert!(validate_half_width(100.5).is_err());
        assert!(validate_half_width(f64::NAN).is_err());
        assert_eq!(validate_half_width(100.0).unwrap(), 100.0);
        assert_eq!(validate_half_width(0.01).unwrap(), 0.01);
    }

    #[test]
    fn half_width_auto_resolution() {
        let s = ramp(101, 5000.0, 0.5);
        assert_eq!(HalfWidth::from_cli(None).unwrap(), HalfWidth::Auto);
        assert_eq!(HalfWidth::from_cli(Some(-1.0)).unwrap(), HalfWidth::Auto);
        assert!((HalfWidth::Auto.resolve(&s) - 3.0).abs() < 1e-12);
        assert_eq!(HalfWidth::Fixed(5.0).resolve(&s), 5.0);
        assert_eq!(HalfWidth::Derived(7.0).resolve(&s), 7.0);
        assert_eq!(HalfWidth::Auto.value(), None);
        assert_eq!(HalfWidth::Derived(7.0).to_string(), "7 (auto)");

        let coarse = ramp(3, 5000.0, 100.0);
        assert_eq!(HalfWidth::Auto.resolve(&coarse), MAX_HALF_WIDTH);
    }

    #[test]
    fn degree_validation_bounds() {
        assert!(validate_degree(-1).is_err());
        assert!(validate_degree(7).is_err());
        assert_eq!(validate_degree(0).unwrap(), 0);
        assert_eq!(validate_degree(6).unwrap(), 6);
    }
}

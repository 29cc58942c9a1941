//! The calibration session: loaded data, configuration, and the last fit.
//!
//! Every mutation of the inputs to a fit (spectrum, line list, dX, degree) drops
//! the stored run, so a model on display always matches the current inputs.
//! Operations that fail leave the session untouched.

use std::path::Path;

use crate::domain::{
    ClearRequest, HalfWidth, LineList, SessionConfig, Spectrum, has_lines, validate_degree, validate_half_width,
};
use crate::error::CalibError;
use crate::fit::{Interpolation, LineFitter, ResolutionFit};
use crate::io::LoadOptions;

pub mod console;
pub mod menu;

pub use console::*;
pub use menu::*;

#[derive(Debug, Default)]
pub struct Session {
    spectrum: Option<Spectrum>,
    lines: Option<LineList>,
    config: SessionConfig,
    run: Option<ResolutionFit>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn lines(&self) -> Option<&LineList> {
        self.lines.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The last successful fit, if it is still valid.
    pub fn last_fit(&self) -> Option<&ResolutionFit> {
        self.run.as_ref()
    }

    /// A half-width derived from the previous spectrum is dropped with it.
    pub fn set_spectrum(&mut self, spectrum: Spectrum) {
        self.spectrum = Some(spectrum);
        if let HalfWidth::Derived(_) = self.config.half_width {
            self.config.half_width = HalfWidth::Auto;
        }
        self.invalidate();
    }

    pub fn set_lines(&mut self, lines: Option<LineList>) {
        self.lines = lines;
        self.invalidate();
    }

    /// Load a spectrum with the configured variance options.
    pub fn load_spectrum(&mut self, path: &Path) -> Result<&Spectrum, CalibError> {
        let opts = LoadOptions {
            use_variance: self.config.use_variance,
            variance_policy: self.config.variance_policy,
        };
        let spectrum = crate::io::load_spectrum(path, &opts)?;
        self.set_spectrum(spectrum);
        self.spectrum.as_ref().ok_or(CalibError::NoSpectrum)
    }

    /// Replace the line list from the configured lines file.
    pub fn read_lines(&mut self) -> Result<usize, CalibError> {
        let list = crate::io::load_lines(&self.config.lines_file)?;
        let n = list.len();
        self.set_lines(Some(list));
        Ok(n)
    }

    /// Write the line list to the configured lines file.
    pub fn write_lines(&self) -> Result<usize, CalibError> {
        crate::io::save_lines(self.lines.as_ref(), &self.config.lines_file)
    }

    /// Merge picked wavelengths into the list. Picking nothing changes nothing.
    pub fn add_lines(&mut self, picked: &[f64]) -> usize {
        if picked.is_empty() {
            return 0;
        }
        let merged = LineList::insert(self.lines.take(), picked);
        self.set_lines(Some(merged));
        picked.len()
    }

    pub fn remove_line(&mut self, one_based_index: usize) -> Result<f64, CalibError> {
        let list = self.lines.as_mut().ok_or(CalibError::NoLineList)?;
        let removed = list.remove_at(one_based_index)?;
        self.invalidate();
        Ok(removed)
    }

    pub fn request_clear(&self) -> Result<ClearRequest, CalibError> {
        self.lines
            .as_ref()
            .map(LineList::request_clear)
            .ok_or(CalibError::NoLineList)
    }

    /// Returns whether the list was discarded.
    pub fn confirm_clear(&mut self, request: ClearRequest, token: &str) -> bool {
        let cleared = LineList::confirm_clear(&mut self.lines, request, token);
        if cleared {
            self.invalidate();
        }
        cleared
    }

    pub fn set_half_width(&mut self, dx: f64) -> Result<(), CalibError> {
        let dx = validate_half_width(dx)?;
        let changed = self.config.half_width.value() != Some(dx);
        self.config.half_width = HalfWidth::Fixed(dx);
        if changed {
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_degree(&mut self, degree: i64) -> Result<(), CalibError> {
        let degree = validate_degree(degree)?;
        if self.config.degree != degree {
            self.config.degree = degree;
            self.invalidate();
        }
        Ok(())
    }

    /// Check that a spectrum and a non-empty line list are present.
    pub fn ensure_fit_inputs(&self) -> Result<(), CalibError> {
        if self.spectrum.is_none() {
            return Err(CalibError::NoSpectrum);
        }
        if !has_lines(self.lines.as_ref()) {
            return Err(CalibError::NoLineList);
        }
        Ok(())
    }

    /// Fit every line and the resolution polynomial.
    ///
    /// An automatic half-width is resolved against the spectrum and kept until
    /// the spectrum changes. On error the previous run stays in place.
    pub fn run_fit(&mut self, fitter: &dyn LineFitter) -> Result<&ResolutionFit, CalibError> {
        let spectrum = self.spectrum.as_ref().ok_or(CalibError::NoSpectrum)?;
        let lines = self
            .lines
            .as_ref()
            .filter(|l| !l.is_empty())
            .ok_or(CalibError::NoLineList)?;

        let half_width = self.config.half_width.resolve(spectrum);
        let run = crate::fit::fit(spectrum, lines, half_width, self.config.degree, fitter)?;

        if self.config.half_width == HalfWidth::Auto {
            tracing::info!(half_width, "auto half-width resolved");
            self.config.half_width = HalfWidth::Derived(half_width);
        }
        Ok(self.run.insert(run))
    }

    /// Evaluate the stored model. The domain check comes first, so a wavelength
    /// outside the spectrum is rejected even without a model.
    pub fn interpolate(&self, wavelength: f64) -> Result<Interpolation, CalibError> {
        let spectrum = self.spectrum.as_ref().ok_or(CalibError::NoSpectrum)?;
        if !spectrum.contains(wavelength) {
            let (min, max) = spectrum.domain();
            return Err(CalibError::OutOfDomain { wavelength, min, max });
        }
        let run = self.run.as_ref().ok_or(CalibError::NoModel)?;
        crate::fit::interpolate(&run.model, spectrum, wavelength)
    }

    pub fn export_model(&self, path: &Path) -> Result<(), CalibError> {
        let run = self.run.as_ref().ok_or(CalibError::NoModel)?;
        let spectrum = self.spectrum.as_ref().ok_or(CalibError::NoSpectrum)?;
        crate::io::write_model_json(path, run, spectrum)
    }

    fn invalidate(&mut self) {
        if self.run.take().is_some() {
            tracing::debug!("resolution model invalidated");
        }
    }
}

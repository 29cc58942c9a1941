//! Write resolution model JSON files.
//!
//! The model JSON is the portable record of a calibration:
//! - polynomial degree, normalisation, and coefficients
//! - run metadata (spectrum source, half-width, creation time)
//! - the per-line widths that were fitted
//! - a precomputed FWHM grid across the spectrum for quick plotting

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ResolutionModel, Spectrum};
use crate::error::CalibError;
use crate::fit::ResolutionFit;

const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub created: DateTime<Utc>,
    pub spectrum: Option<PathBuf>,
    pub half_width: f64,
    pub model: ResolutionModel,
    pub weighted_rms: f64,
    pub lines: Vec<LinePoint>,
    pub grid: ModelGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePoint {
    pub wavelength: f64,
    pub fwhm: f64,
    pub fwhm_err: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGrid {
    pub wavelength: Vec<f64>,
    pub fwhm: Vec<f64>,
    pub resolving_power: Vec<f64>,
}

impl ModelFile {
    pub fn new(run: &ResolutionFit, spectrum: &Spectrum) -> Self {
        let (lo, hi) = spectrum.domain();
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            created: Utc::now(),
            spectrum: spectrum.source().map(Path::to_path_buf),
            half_width: run.half_width,
            model: run.model.clone(),
            weighted_rms: run.weighted_rms,
            lines: run
                .points
                .iter()
                .map(|p| LinePoint {
                    wavelength: p.wavelength,
                    fwhm: p.fwhm,
                    fwhm_err: p.fwhm_err,
                })
                .collect(),
            grid: build_grid(&run.model, lo, hi, GRID_POINTS),
        }
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, run: &ResolutionFit, spectrum: &Spectrum) -> Result<(), CalibError> {
    let io_err = |source: std::io::Error| CalibError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    serde_json::to_writer_pretty(file, &ModelFile::new(run, spectrum))
        .map_err(|e| io_err(std::io::Error::other(e)))?;
    tracing::info!(path = %path.display(), "resolution model written");
    Ok(())
}

fn build_grid(model: &ResolutionModel, lo: f64, hi: f64, n: usize) -> ModelGrid {
    let n = n.max(2);
    let mut wavelength = Vec::with_capacity(n);
    let mut fwhm = Vec::with_capacity(n);
    let mut resolving_power = Vec::with_capacity(n);

    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let x = lo + u * (hi - lo);
        let y = model.eval(x);
        wavelength.push(x);
        fwhm.push(y);
        resolving_power.push(x / y);
    }

    ModelGrid {
        wavelength,
        fwhm,
        resolving_power,
    }
}

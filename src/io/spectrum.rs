//! Sky spectrum text loader.
//!
//! Accepted layout: whitespace or comma separated columns, `#` comments and blank
//! lines skipped.
//!
//! - 3+ columns: wavelength, flux, flux uncertainty (extra columns ignored)
//! - 2 columns: a model spectrum; uncertainty is the constant `|0.1 * min(flux)|`
//!
//! With `use_variance`, the flux is replaced by the variance (`err^2`) and the
//! uncertainty by `0.1 * min(variance)`, subject to [`VariancePolicy`].

use std::fs;
use std::path::Path;

use crate::domain::{Spectrum, VariancePolicy};
use crate::error::CalibError;

/// Fraction of the minimum value used for derived uncertainties.
const DERIVED_ERROR_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub use_variance: bool,
    pub variance_policy: VariancePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            use_variance: false,
            variance_policy: VariancePolicy::RejectNonPositive,
        }
    }
}

/// Load a spectrum from a text file.
pub fn load_spectrum(path: &Path, opts: &LoadOptions) -> Result<Spectrum, CalibError> {
    let text = fs::read_to_string(path).map_err(|e| CalibError::from_open(path, e))?;
    let spectrum = parse_spectrum(&text, path, opts)?.with_source(path);
    let (lo, hi) = spectrum.domain();
    tracing::info!(
        path = %path.display(),
        samples = spectrum.len(),
        min = lo,
        max = hi,
        "spectrum loaded"
    );
    Ok(spectrum)
}

/// Parse spectrum text. `path` is only used for error messages.
pub fn parse_spectrum(text: &str, path: &Path, opts: &LoadOptions) -> Result<Spectrum, CalibError> {
    let parse_err = |message: String| CalibError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut columns: Option<usize> = None;
    let (mut x, mut y, mut e) = (Vec::new(), Vec::new(), Vec::new());

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();

        let width = fields.len().min(3);
        if width < 2 {
            return Err(parse_err(format!("line {}: expected at least 2 columns", idx + 1)));
        }
        match columns {
            None => columns = Some(width),
            Some(c) if c != width => {
                return Err(parse_err(format!(
                    "line {}: expected {c} columns, found {}",
                    idx + 1,
                    fields.len()
                )));
            }
            Some(_) => {}
        }

        let mut row = [0.0_f64; 3];
        for (slot, field) in row.iter_mut().zip(&fields[..width]) {
            *slot = field
                .parse()
                .map_err(|_| parse_err(format!("line {}: '{field}' is not a number", idx + 1)))?;
        }
        x.push(row[0]);
        y.push(row[1]);
        if width == 3 {
            e.push(row[2]);
        }
    }

    let Some(columns) = columns else {
        return Err(parse_err("file contains no samples".to_string()));
    };

    if columns == 2 {
        if opts.use_variance {
            tracing::warn!(path = %path.display(), "no uncertainty column; ignoring variance mode");
        }
        let floor = (DERIVED_ERROR_FRACTION * min_of(&y)).abs().max(f64::EPSILON);
        e = vec![floor; y.len()];
    } else if opts.use_variance {
        let var: Vec<f64> = e.iter().map(|v| v * v).collect();
        let min_var = min_of(&var);
        if min_var <= 0.0 && opts.variance_policy == VariancePolicy::RejectNonPositive {
            return Err(parse_err(
                "flux variance reaches zero; cannot derive uncertainties (see --variance-policy)".to_string(),
            ));
        }
        let floor = (DERIVED_ERROR_FRACTION * min_var).max(f64::EPSILON);
        y = var;
        e = vec![floor; y.len()];
    }

    Spectrum::new(x, y, e).map_err(|err| parse_err(err.to_string()))
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

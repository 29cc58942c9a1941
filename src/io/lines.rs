//! Line list persistence.
//!
//! The file is plain text with one wavelength per line, written as `{:9.3}`.
//! Blank lines and `#` comments are skipped on read. A missing file is a normal
//! condition reported as `NotFound`.

use std::fs;
use std::path::Path;

use crate::domain::LineList;
use crate::error::CalibError;

/// Read a line list from `path`.
pub fn load_lines(path: &Path) -> Result<LineList, CalibError> {
    let text = fs::read_to_string(path).map_err(|e| CalibError::from_open(path, e))?;
    parse_lines(&text, path)
}

/// Write `list` to `path`, overwriting it. Returns the number of lines written.
pub fn save_lines(list: Option<&LineList>, path: &Path) -> Result<usize, CalibError> {
    let list = list.ok_or(CalibError::NoLineList)?;
    fs::write(path, format_lines(list)).map_err(|source| CalibError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), count = list.len(), "line list written");
    Ok(list.len())
}

/// One `{:9.3}` wavelength per line.
pub fn format_lines(list: &LineList) -> String {
    let mut out = String::with_capacity(list.len() * 10);
    for x in list.values() {
        out.push_str(&format!("{x:9.3}\n"));
    }
    out
}

fn parse_lines(text: &str, path: &Path) -> Result<LineList, CalibError> {
    let mut values = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| CalibError::Parse {
            path: path.to_path_buf(),
            message: format!("line {}: expected a wavelength, got '{line}'", idx + 1),
        })?;
        if !value.is_finite() {
            return Err(CalibError::Parse {
                path: path.to_path_buf(),
                message: format!("line {}: non-finite wavelength", idx + 1),
            });
        }
        values.push(value);
    }

    if values.is_empty() {
        return Err(CalibError::Parse {
            path: path.to_path_buf(),
            message: "file contains no wavelengths".to_string(),
        });
    }

    tracing::info!(path = %path.display(), count = values.len(), "line list read");
    Ok(LineList::from_values(values))
}

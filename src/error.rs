//! Error types.
//!
//! Two layers:
//!
//! - [`AppError`]: fatal errors that end the process (terminal setup, console I/O,
//!   invalid startup configuration). Carries the process exit code.
//! - [`CalibError`]: recoverable calibration errors. The session reports these at the
//!   submenu boundary and keeps running.

use std::path::PathBuf;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Recoverable errors surfaced to the user by the calibration session.
#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    #[error("could not find file '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("could not parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("no spectrum loaded")]
    NoSpectrum,

    #[error("no lines yet")]
    NoLineList,

    #[error("no line at position {index} (valid: 1-{len})")]
    Index { index: usize, len: usize },

    #[error("only {successes} line fit(s) succeeded; a degree {degree} polynomial needs at least {required}")]
    InsufficientData {
        successes: usize,
        required: usize,
        degree: usize,
    },

    #[error("degree {degree} polynomial is singular for the {points} surviving lines")]
    SingularModel { degree: usize, points: usize },

    #[error("wavelength {wavelength} is outside the spectrum ({min:.3} - {max:.3})")]
    OutOfDomain { wavelength: f64, min: f64, max: f64 },

    #[error("{0}")]
    InvalidConfig(String),

    #[error("no resolution model yet (run the fit first)")]
    NoModel,

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CalibError {
    /// Map an I/O error from opening `path` to `NotFound` or `Io`.
    pub fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CalibError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            CalibError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

impl From<CalibError> for AppError {
    fn from(value: CalibError) -> Self {
        AppError::new(1, value.to_string())
    }
}

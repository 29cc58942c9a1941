//! Command-line parsing for the sky-line resolution fitter.
//!
//! The CLI only seeds the session; everything else happens in the interactive menu.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{DEFAULT_LINES_FILE, VariancePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "skyfit",
    version,
    about = "Interactive sky-line spectral resolution calibration"
)]
pub struct Cli {
    /// Sky spectrum to load at startup.
    #[arg(value_name = "SKY")]
    pub sky: Option<PathBuf>,

    /// Read the line list from the lines file at startup.
    #[arg(long)]
    pub readlines: bool,

    /// Line list file used by read/write lines.
    #[arg(long, value_name = "PATH", env = "SKYFIT_LINES_FILE", default_value = DEFAULT_LINES_FILE)]
    pub lines_file: PathBuf,

    /// Use the flux variance (err^2) as the flux.
    #[arg(long)]
    pub usevar: bool,

    /// How a zero or negative minimum variance is treated with --usevar.
    #[arg(long, value_enum, default_value_t = VariancePolicy::RejectNonPositive)]
    pub variance_policy: VariancePolicy,

    /// Half-width of the per-line fit window; omitted or negative for auto.
    #[arg(long = "dx", visible_alias = "dX", value_name = "F", allow_negative_numbers = true)]
    pub dx: Option<f64>,

    /// Degree of the resolution polynomial (0-6).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub deg: i64,
}

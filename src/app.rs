//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging on stderr
//! - loads the startup spectrum and line list
//! - runs the interactive session with the terminal collaborators

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::domain::{HalfWidth, SessionConfig, validate_degree};
use crate::error::AppError;
use crate::fit::GaussianLineFitter;
use crate::session::{Collaborators, Console, Session, SessionEnd, StdConsole, run_session};
use crate::tui::TuiPlotter;

/// Entry point for the `skyfit` binary.
pub fn run() -> Result<SessionEnd, AppError> {
    // Before parsing, so `.env` can supply SKYFIT_LINES_FILE.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = session_config_from_args(&cli)?;
    tracing::debug!(?config, "session configuration");

    let mut session = Session::new(config);
    let mut console = StdConsole;
    load_startup_files(&mut session, &cli, &mut console)?;

    let fitter = GaussianLineFitter::default();
    let mut plotter = TuiPlotter;
    let mut tools = Collaborators {
        fitter: &fitter,
        plotter: &mut plotter,
    };
    run_session(&mut session, &mut console, &mut tools)
}

/// Logs go to stderr so the menu on stdout stays readable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn session_config_from_args(cli: &Cli) -> Result<SessionConfig, AppError> {
    Ok(SessionConfig {
        half_width: HalfWidth::from_cli(cli.dx)?,
        degree: validate_degree(cli.deg)?,
        lines_file: cli.lines_file.clone(),
        use_variance: cli.usevar,
        variance_policy: cli.variance_policy,
    })
}

/// Startup files are optional: failures are reported and the session starts
/// without them.
fn load_startup_files(session: &mut Session, cli: &Cli, console: &mut dyn Console) -> Result<(), AppError> {
    if let Some(path) = &cli.sky {
        match session.load_spectrum(path) {
            Ok(spectrum) => {
                let msg = format!("Loaded {} samples from {}", spectrum.len(), path.display());
                console.print(&msg)?;
            }
            Err(e) => console.print(&format!("error: {e}"))?,
        }
    }

    if cli.readlines {
        match session.read_lines() {
            Ok(n) => console.print(&format!("{n} lines read from {}", cli.lines_file.display()))?,
            Err(e) => console.print(&format!("error: {e}"))?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VariancePolicy;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn config_from_args() {
        let cli = parse(&["skyfit", "--dx", "4.5", "--deg", "2", "--usevar", "--variance-policy", "allow"]);
        let config = session_config_from_args(&cli).unwrap();
        assert_eq!(config.half_width, HalfWidth::Fixed(4.5));
        assert_eq!(config.degree, 2);
        assert!(config.use_variance);
        assert_eq!(config.variance_policy, VariancePolicy::Allow);

        let config = session_config_from_args(&parse(&["skyfit", "--dx", "-1"])).unwrap();
        assert_eq!(config.half_width, HalfWidth::Auto);
    }

    #[test]
    fn invalid_startup_values_are_fatal() {
        for args in [
            &["skyfit", "--dx", "0"][..],
            &["skyfit", "--dx", "250"][..],
            &["skyfit", "--deg", "7"][..],
            &["skyfit", "--deg", "-1"][..],
        ] {
            let err = session_config_from_args(&parse(args)).unwrap_err();
            assert_eq!(err.exit_code(), 1);
        }
    }
}

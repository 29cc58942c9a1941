use std::process::ExitCode;

use skyfit::session::SessionEnd;

/// Exit status after the input stream ends mid-session.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    match skyfit::app::run() {
        Ok(SessionEnd::Quit) => ExitCode::SUCCESS,
        Ok(SessionEnd::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

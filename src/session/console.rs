//! Line-oriented console used by the menu.

use std::io::{self, BufRead, Write};

use crate::error::AppError;

/// Prompt prefix for every console read.
pub const PROMPT: &str = ">>> ";

pub trait Console {
    /// Show `prompt` and read one line without its line terminator.
    /// Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AppError>;

    fn print(&mut self, text: &str) -> Result<(), AppError>;
}

/// Console over the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AppError> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")
            .and_then(|_| stdout.flush())
            .map_err(console_error)?;

        let mut buf = String::new();
        let n = io::stdin().lock().read_line(&mut buf).map_err(console_error)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn print(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(io::stdout().lock(), "{text}").map_err(console_error)
    }
}

fn console_error(e: io::Error) -> AppError {
    AppError::new(1, format!("Console I/O error: {e}"))
}

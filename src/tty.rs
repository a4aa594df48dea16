//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection and user prompting.

use std::io::{self, BufRead, IsTerminal, Write};

use synapse_lab::{Error, Result};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

/// Prompts go to stderr, so only stdin and stderr need a terminal.
pub fn can_prompt() -> bool {
    is_stdin_tty() && is_stderr_tty()
}

/// Prompt on stderr and read one trimmed line. End of input is an error so
/// re-prompt loops terminate.
pub fn prompt(message: &str) -> Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    read_answer(io::stdin().lock())
}

fn read_answer<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| Error::internal_io(e.to_string(), Some("read input".to_string())))?;

    if read == 0 {
        return Err(Error::validation_missing_argument(vec!["input".to_string()])
            .with_hint("Input ended before a value was entered"));
    }

    Ok(line.trim().to_string())
}

/// Read a secret without echo.
pub fn prompt_password(message: &str) -> Result<String> {
    dialoguer::Password::new()
        .with_prompt(message)
        .interact()
        .map_err(|e| Error::internal_io(e.to_string(), Some("read password".to_string())))
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if is_stderr_tty() {
        eprintln!("{}", message);
    }
}

// log_status! macro is defined in lib.rs (#[macro_export]) and available crate-wide.

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_answer_trims_line() {
        let answer = read_answer(Cursor::new("  cdc-lab \n")).unwrap();
        assert_eq!(answer, "cdc-lab");
    }

    #[test]
    fn read_answer_fails_at_end_of_input() {
        let err = read_answer(Cursor::new("")).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        assert_eq!(read_answer(Cursor::new("\n")).unwrap(), "");
    }
}

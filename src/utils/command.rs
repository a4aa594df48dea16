//! Command execution primitives with consistent error handling.

use std::process::{Command, Output};

use serde::Serialize;

use crate::error::{Error, Result};

/// Run a command and capture its output regardless of exit status.
///
/// Only a failure to spawn the process is an error; a non-zero exit is
/// reported through `CapturedOutput::success`.
pub fn capture(program: &str, args: &[&str], context: &str) -> Result<CapturedOutput> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        Error::internal_io(
            format!("Failed to run {}: {}", context, e),
            Some(context.to_string()),
        )
    })?;

    Ok(CapturedOutput::from_output(&output))
}

/// Captured output from command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl CapturedOutput {
    pub fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        }
    }

    /// Stderr when present, stdout otherwise.
    pub fn error_text(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

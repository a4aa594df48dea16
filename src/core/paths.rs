use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base config directory (~/.config/synapse-lab/ on Unix, %APPDATA%\synapse-lab on Windows)
pub fn synapse_lab() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("synapse-lab"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("synapse-lab"))
    }
}

/// Global synapse-lab.json config file path
pub fn config_json() -> Result<PathBuf> {
    Ok(synapse_lab()?.join("synapse-lab.json"))
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

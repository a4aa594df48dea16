use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use synapse_lab::defaults::{self, Defaults, SynapseLabConfig};
use synapse_lab::Error;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file)
    Show {
        /// Show only built-in defaults (ignore synapse-lab.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Set a configuration value at a JSON pointer path
    Set {
        /// JSON pointer path (e.g., /defaults/naming/max_attempts)
        pointer: String,
        /// Value to set (JSON)
        value: String,
    },
    /// Remove a configuration value at a JSON pointer path
    Remove {
        /// JSON pointer path (e.g., /defaults/location)
        pointer: String,
    },
    /// Reset configuration to built-in defaults (deletes synapse-lab.json)
    Reset,
    /// Show the path to synapse-lab.json
    Path,
}

#[derive(Debug, Default, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<SynapseLabConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<Defaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
}

impl ConfigOutput {
    fn named(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Default::default()
        }
    }
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Set { pointer, value } => set(&pointer, &value),
        ConfigCommand::Remove { pointer } => remove(&pointer),
        ConfigCommand::Reset => reset(),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let output = if builtin {
        ConfigOutput {
            defaults: Some(defaults::builtin_defaults()),
            ..ConfigOutput::named("config.show")
        }
    } else {
        ConfigOutput {
            config: Some(defaults::load_config()),
            ..ConfigOutput::named("config.show")
        }
    };
    Ok((output, 0))
}

fn set(pointer: &str, value_str: &str) -> CmdResult<ConfigOutput> {
    require_pointer(pointer)?;

    let value: Value = serde_json::from_str(value_str).map_err(|e| {
        Error::validation_invalid_json(
            e,
            Some("parse value".to_string()),
            Some(value_str.chars().take(200).collect::<String>()),
        )
    })?;

    let config = edit_config(|json| {
        synapse_lab::config::set_json_pointer(json, pointer, value.clone())
    })?;

    Ok((
        ConfigOutput {
            config: Some(config),
            pointer: Some(pointer.to_string()),
            value: Some(value),
            ..ConfigOutput::named("config.set")
        },
        0,
    ))
}

fn remove(pointer: &str) -> CmdResult<ConfigOutput> {
    require_pointer(pointer)?;

    let config = edit_config(|json| synapse_lab::config::remove_json_pointer(json, pointer))?;

    Ok((
        ConfigOutput {
            config: Some(config),
            pointer: Some(pointer.to_string()),
            ..ConfigOutput::named("config.remove")
        },
        0,
    ))
}

fn reset() -> CmdResult<ConfigOutput> {
    let deleted = defaults::reset_config()?;

    Ok((
        ConfigOutput {
            defaults: Some(defaults::builtin_defaults()),
            path: Some(defaults::config_path()?),
            deleted: Some(deleted),
            ..ConfigOutput::named("config.reset")
        },
        0,
    ))
}

fn path() -> CmdResult<ConfigOutput> {
    Ok((
        ConfigOutput {
            path: Some(defaults::config_path()?),
            exists: Some(defaults::config_exists()),
            ..ConfigOutput::named("config.path")
        },
        0,
    ))
}

fn require_pointer(pointer: &str) -> synapse_lab::Result<()> {
    if pointer.starts_with('/') {
        Ok(())
    } else {
        Err(Error::validation_invalid_argument(
            "pointer",
            "JSON pointer must start with '/'",
            Some(pointer.to_string()),
            None,
        ))
    }
}

/// Round-trip the stored config through JSON, apply `edit`, and save it if
/// the result still deserializes.
fn edit_config<F>(edit: F) -> synapse_lab::Result<SynapseLabConfig>
where
    F: FnOnce(&mut Value) -> synapse_lab::Result<()>,
{
    let current = defaults::load_config();
    let mut json = serde_json::to_value(&current)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize config".to_string())))?;

    edit(&mut json)?;

    let config: SynapseLabConfig = serde_json::from_value(json).map_err(|e| {
        Error::validation_invalid_json(e, Some("deserialize config".to_string()), None)
    })?;
    defaults::save_config(&config)?;
    Ok(config)
}

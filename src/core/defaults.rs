use serde::{Deserialize, Serialize};
use std::fs;

use crate::paths;
use crate::utils::io;

/// Root configuration structure for synapse-lab.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SynapseLabConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via synapse-lab.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_cli")]
    pub cli: CliConfig,

    #[serde(default = "default_naming")]
    pub naming: NamingConfig,

    #[serde(default = "default_deploy")]
    pub deploy: DeployConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            location: default_location(),
            cli: default_cli(),
            naming: default_naming(),
            deploy: default_deploy(),
        }
    }
}

/// Which cloud CLI binary to invoke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_program")]
    pub program: String,
}

/// Name resolution policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Probe the random fallback name once before accepting it.
    /// The name is accepted either way; only the recorded outcome changes.
    #[serde(default)]
    pub verify_fallback: bool,
}

/// Configuration for deploy operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_template_file")]
    pub template_file: String,

    #[serde(default = "default_data_container")]
    pub data_container: String,

    #[serde(default = "default_folders")]
    pub folders: Vec<String>,

    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    #[serde(default = "default_portal_url")]
    pub portal_url: String,

    #[serde(default = "default_studio_url")]
    pub studio_url: String,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_location() -> String {
    "eastus".to_string()
}

fn default_cli() -> CliConfig {
    CliConfig {
        program: default_program(),
    }
}

fn default_program() -> String {
    "az".to_string()
}

fn default_naming() -> NamingConfig {
    NamingConfig {
        max_attempts: default_max_attempts(),
        verify_fallback: false,
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_deploy() -> DeployConfig {
    DeployConfig {
        template_file: default_template_file(),
        data_container: default_data_container(),
        folders: default_folders(),
        summary_file: default_summary_file(),
        portal_url: default_portal_url(),
        studio_url: default_studio_url(),
    }
}

fn default_template_file() -> String {
    "infra/main.bicep".to_string()
}

fn default_data_container() -> String {
    "data".to_string()
}

fn default_folders() -> Vec<String> {
    vec![
        "source".to_string(),
        "destination".to_string(),
        "metadata".to_string(),
    ]
}

fn default_summary_file() -> String {
    "deployment-info.txt".to_string()
}

fn default_portal_url() -> String {
    "https://portal.azure.com/#@{{tenantId}}/resource/subscriptions/{{subscriptionId}}/resourceGroups/{{resourceGroup}}/overview".to_string()
}

fn default_studio_url() -> String {
    "https://web.azuresynapse.net?workspace=%2fsubscriptions%2f{{subscriptionId}}%2fresourceGroups%2f{{resourceGroup}}%2fproviders%2fMicrosoft.Synapse%2fworkspaces%2f{{workspace}}".to_string()
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If synapse-lab.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full config, falling back to defaults on any error.
pub fn load_config() -> SynapseLabConfig {
    load_config_from_file().unwrap_or_default()
}

fn load_config_from_file() -> crate::Result<SynapseLabConfig> {
    let path = paths::config_json()?;

    if !path.exists() {
        return Err(crate::Error::other("synapse-lab.json not found"));
    }

    let content = io::read_file(&path, &format!("read {}", path.display()))?;

    parse_config(&content, &path.display().to_string())
}

/// Parse config JSON, filling every missing field from built-in defaults.
pub fn parse_config(content: &str, origin: &str) -> crate::Result<SynapseLabConfig> {
    serde_json::from_str(content).map_err(|e| crate::Error::config_invalid_json(origin, e))
}

/// Save config to synapse-lab.json (creates if missing).
pub fn save_config(config: &SynapseLabConfig) -> crate::Result<()> {
    let path = paths::config_json()?;

    if let Some(parent) = path.parent() {
        io::ensure_dir(parent, &format!("create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize synapse-lab.json".to_string()))
    })?;

    io::write_file_atomic(&path, &content, &format!("write {}", path.display()))
}

pub fn config_exists() -> bool {
    paths::config_json().map(|p| p.exists()).unwrap_or(false)
}

/// Delete synapse-lab.json (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::config_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub fn config_path() -> crate::Result<String> {
    Ok(paths::config_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

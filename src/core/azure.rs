//! Azure CLI collaborator.
//!
//! Every cloud interaction goes through the `az` binary. The traits here are
//! the seams the provisioning pipeline depends on; [`AzCli`] is the only
//! production implementation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CloudCommandFailedDetails, Error, Result};
use crate::naming::NameAvailability;
use crate::utils::command;

const SECRET_PARAMETERS: &[&str] = &["sqlAdminPassword"];
const PLACEHOLDER_BLOB: &str = ".placeholder";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user: String,
    pub subscription_id: String,
    pub subscription_name: String,
    pub tenant_id: String,
}

/// Reports the principal of the current CLI session.
pub trait IdentityProvider {
    fn current_identity(&self) -> Result<Identity>;
}

/// Parameters passed to the infrastructure template.
#[derive(Clone)]
pub struct DeploymentParameters {
    pub location: String,
    pub project_name: String,
    pub sql_admin_password: String,
}

impl fmt::Debug for DeploymentParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentParameters")
            .field("location", &self.location)
            .field("project_name", &self.project_name)
            .field("sql_admin_password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutputs {
    pub storage_account_name: String,
    pub synapse_workspace_name: String,
    pub synapse_web_endpoint: String,
    pub data_container_path: String,
}

pub trait Provisioner {
    fn create_resource_group(&self, name: &str, location: &str) -> Result<()>;

    fn deploy_template(
        &self,
        resource_group: &str,
        deployment_name: &str,
        template_file: &Path,
        parameters: &DeploymentParameters,
    ) -> Result<DeploymentOutputs>;

    fn upload_placeholder(&self, storage_account: &str, container: &str, folder: &str)
        -> Result<()>;
}

/// Everything the provisioning pipeline needs from the cloud.
pub trait Cloud: IdentityProvider + NameAvailability + Provisioner {}

impl<T: IdentityProvider + NameAvailability + Provisioner> Cloud for T {}

/// `az` CLI client.
#[derive(Debug, Clone)]
pub struct AzCli {
    program: String,
}

impl AzCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn invoke(&self, args: &[String]) -> Result<String> {
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = command::capture(&self.program, &arg_refs, "az").map_err(|e| {
            e.with_hint(format!(
                "Install the Azure CLI or set /defaults/cli/program (tried '{}')",
                self.program
            ))
        })?;

        if !output.success {
            return Err(Error::cloud_command_failed(CloudCommandFailedDetails {
                command: display_command(&self.program, args),
                exit_code: output.exit_code,
                stderr: output.error_text().to_string(),
            }));
        }

        Ok(output.stdout)
    }
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new("az")
    }
}

impl IdentityProvider for AzCli {
    fn current_identity(&self) -> Result<Identity> {
        let stdout = self.invoke(&account_show_args()).map_err(|e| {
            let reason = e
                .details
                .get("stderr")
                .and_then(Value::as_str)
                .unwrap_or(e.message.as_str())
                .to_string();
            Error::cloud_not_authenticated(reason)
        })?;
        parse_identity(&stdout)
    }
}

impl NameAvailability for AzCli {
    fn is_available(&self, storage_account_name: &str) -> Result<bool> {
        let stdout = self.invoke(&check_name_args(storage_account_name))?;
        parse_name_available(&stdout)
    }
}

impl Provisioner for AzCli {
    fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
        self.invoke(&group_create_args(name, location)).map(|_| ())
    }

    fn deploy_template(
        &self,
        resource_group: &str,
        deployment_name: &str,
        template_file: &Path,
        parameters: &DeploymentParameters,
    ) -> Result<DeploymentOutputs> {
        let stdout = self.invoke(&deployment_args(
            resource_group,
            deployment_name,
            template_file,
            parameters,
        ))?;
        parse_outputs(&stdout)
    }

    fn upload_placeholder(
        &self,
        storage_account: &str,
        container: &str,
        folder: &str,
    ) -> Result<()> {
        self.invoke(&placeholder_args(storage_account, container, folder))
            .map(|_| ())
    }
}

// ============================================================================
// Argument builders
// ============================================================================

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn account_show_args() -> Vec<String> {
    strings(&["account", "show", "-o", "json"])
}

pub(crate) fn check_name_args(name: &str) -> Vec<String> {
    strings(&[
        "storage",
        "account",
        "check-name",
        "--name",
        name,
        "--query",
        "nameAvailable",
        "-o",
        "tsv",
    ])
}

pub(crate) fn group_create_args(name: &str, location: &str) -> Vec<String> {
    strings(&[
        "group",
        "create",
        "--name",
        name,
        "--location",
        location,
        "-o",
        "none",
    ])
}

pub(crate) fn deployment_args(
    resource_group: &str,
    deployment_name: &str,
    template_file: &Path,
    parameters: &DeploymentParameters,
) -> Vec<String> {
    let mut args = strings(&[
        "deployment",
        "group",
        "create",
        "--resource-group",
        resource_group,
        "--name",
        deployment_name,
    ]);
    args.push("--template-file".to_string());
    args.push(template_file.display().to_string());
    args.push("--parameters".to_string());
    args.push(format!("location={}", parameters.location));
    args.push(format!("projectName={}", parameters.project_name));
    args.push(format!("sqlAdminPassword={}", parameters.sql_admin_password));
    args.extend(strings(&["--query", "properties.outputs", "-o", "json"]));
    args
}

pub(crate) fn placeholder_args(storage_account: &str, container: &str, folder: &str) -> Vec<String> {
    let blob = format!("{}/{}", folder.trim_matches('/'), PLACEHOLDER_BLOB);
    strings(&[
        "storage",
        "blob",
        "upload",
        "--account-name",
        storage_account,
        "--container-name",
        container,
        "--name",
        &blob,
        "--data",
        "",
        "--auth-mode",
        "login",
        "--overwrite",
        "-o",
        "none",
    ])
}

/// Render an invocation for logs and error details with secret values masked.
pub fn display_command(program: &str, args: &[String]) -> String {
    let masked: Vec<String> = args.iter().map(|arg| mask_secret(arg)).collect();
    format!("{} {}", program, masked.join(" "))
}

fn mask_secret(arg: &str) -> String {
    match arg.split_once('=') {
        Some((key, _)) if SECRET_PARAMETERS.contains(&key) => format!("{}=***", key),
        _ => arg.to_string(),
    }
}

// ============================================================================
// Output parsing
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountShow {
    id: String,
    name: String,
    tenant_id: String,
    user: AccountUser,
}

#[derive(Deserialize)]
struct AccountUser {
    name: String,
}

pub(crate) fn parse_identity(stdout: &str) -> Result<Identity> {
    let account: AccountShow = serde_json::from_str(stdout).map_err(|e| {
        Error::internal_json(e.to_string(), Some("parse az account show".to_string()))
    })?;

    Ok(Identity {
        user: account.user.name,
        subscription_id: account.id,
        subscription_name: account.name,
        tenant_id: account.tenant_id,
    })
}

pub(crate) fn parse_name_available(stdout: &str) -> Result<bool> {
    match stdout.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::internal_unexpected(format!(
            "Unexpected check-name output: '{}'",
            other
        ))),
    }
}

/// Parse ARM deployment outputs (`{"name": {"type": .., "value": ..}}`).
pub(crate) fn parse_outputs(stdout: &str) -> Result<DeploymentOutputs> {
    let outputs: Value = serde_json::from_str(stdout).map_err(|e| {
        Error::internal_json(e.to_string(), Some("parse deployment outputs".to_string()))
    })?;

    let get = |key: &str| -> Result<String> {
        outputs
            .get(key)
            .and_then(|o| o.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::internal_json(
                    format!("Deployment output '{}' missing", key),
                    Some("parse deployment outputs".to_string()),
                )
            })
    };

    Ok(DeploymentOutputs {
        storage_account_name: get("storageAccountName")?,
        synapse_workspace_name: get("synapseWorkspaceName")?,
        synapse_web_endpoint: get("synapseWebEndpoint")?,
        data_container_path: get("dataContainerPath")?,
    })
}

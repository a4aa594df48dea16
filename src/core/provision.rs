//! End-to-end lab provisioning: session gate, name resolution, resource
//! group, template deployment and folder placeholders.

use std::path::PathBuf;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::azure::{Cloud, DeploymentOutputs, DeploymentParameters, Identity};
use crate::defaults::Defaults;
use crate::error::{Error, Result};
use crate::naming::{self, ProjectName, Resolution, ResolvePolicy};
use crate::utils::template::{self, TemplateVars};

/// Login name the template assigns to the SQL administrator.
pub const SQL_ADMIN_LOGIN: &str = "sqladminuser";
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Clone)]
pub struct ProvisionRequest {
    pub project_name: ProjectName,
    pub location: String,
    pub sql_admin_password: String,
    pub template_file: PathBuf,
    pub deployment_name: String,
    pub data_container: String,
    pub folders: Vec<String>,
    pub portal_url: String,
    pub studio_url: String,
    pub policy: ResolvePolicy,
    pub dry_run: bool,
}

impl ProvisionRequest {
    /// Build a request from configured defaults. Callers override fields
    /// from CLI flags afterwards.
    pub fn from_defaults(
        project_name: ProjectName,
        sql_admin_password: String,
        deployment_name: String,
        defaults: &Defaults,
    ) -> Self {
        Self {
            project_name,
            location: defaults.location.clone(),
            sql_admin_password,
            template_file: crate::paths::expand(&defaults.deploy.template_file),
            deployment_name,
            data_container: defaults.deploy.data_container.clone(),
            folders: defaults.deploy.folders.clone(),
            portal_url: defaults.deploy.portal_url.clone(),
            studio_url: defaults.deploy.studio_url.clone(),
            policy: ResolvePolicy::from(&defaults.naming),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderOutcome {
    pub folder: String,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    pub identity: Identity,
    pub location: String,
    pub dry_run: bool,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<DeploymentOutputs>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<FolderOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio_url: Option<String>,
}

impl DeploymentReport {
    /// Storage account actually provisioned, falling back to the resolved name.
    pub fn storage_account_name(&self) -> &str {
        self.outputs
            .as_ref()
            .map(|o| o.storage_account_name.as_str())
            .unwrap_or(self.resolution.names.storage_account_name.as_str())
    }

    /// Workspace actually provisioned, falling back to the resolved name.
    pub fn workspace_name(&self) -> &str {
        self.outputs
            .as_ref()
            .map(|o| o.synapse_workspace_name.as_str())
            .unwrap_or(self.resolution.names.workspace_name.as_str())
    }
}

/// Enforce the SQL administrator password policy: 8-128 characters, at
/// least three of the four character classes, and no admin login inside.
pub fn validate_sql_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(weak_password(format!(
            "Password must be {}-{} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }

    let classes = [
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    if classes.iter().filter(|present| **present).count() < 3 {
        return Err(weak_password(
            "Password must contain at least three of: uppercase, lowercase, digit, symbol",
        ));
    }

    if password.to_ascii_lowercase().contains(SQL_ADMIN_LOGIN) {
        return Err(weak_password(format!(
            "Password must not contain the login name '{}'",
            SQL_ADMIN_LOGIN
        )));
    }

    Ok(())
}

fn weak_password(problem: impl Into<String>) -> Error {
    Error::validation_invalid_argument("sql_admin_password", problem, None, None)
}

/// Run the full pipeline with the thread RNG.
pub fn run<C: Cloud + ?Sized>(cloud: &C, request: &ProvisionRequest) -> Result<DeploymentReport> {
    run_with(cloud, request, &mut rand::rng())
}

pub fn run_with<C, R>(cloud: &C, request: &ProvisionRequest, rng: &mut R) -> Result<DeploymentReport>
where
    C: Cloud + ?Sized,
    R: Rng + ?Sized,
{
    if !request.dry_run {
        validate_sql_password(&request.sql_admin_password)?;
        if !request.template_file.is_file() {
            return Err(Error::validation_invalid_argument(
                "template",
                format!(
                    "Infrastructure template not found: {}",
                    request.template_file.display()
                ),
                None,
                None,
            )
            .with_hint("Pass --template or set /defaults/deploy/template_file"));
        }
    }

    let identity = cloud.current_identity()?;
    log_status!(
        "deploy",
        "Signed in as {} (subscription '{}')",
        identity.user,
        identity.subscription_name
    );

    let resolution =
        naming::resolve_with(&request.project_name, cloud, &request.policy, rng);
    for warning in &resolution.warnings {
        log_status!("names", "Warning: {}", warning);
    }

    let mut report = DeploymentReport {
        identity,
        location: request.location.clone(),
        dry_run: request.dry_run,
        resolution,
        outputs: None,
        folders: Vec::new(),
        portal_url: None,
        studio_url: None,
    };

    if request.dry_run {
        return Ok(report);
    }

    let names = report.resolution.names.clone();

    log_status!("deploy", "Creating resource group {}", names.resource_group_name);
    cloud
        .create_resource_group(&names.resource_group_name, &request.location)
        .map_err(|e| {
            Error::cloud_provision_failed(
                &names.resource_group_name,
                "create_resource_group",
                failure_text(&e),
            )
        })?;

    log_status!(
        "deploy",
        "Deploying {} as '{}' (this can take several minutes)",
        request.template_file.display(),
        request.deployment_name
    );
    let parameters = DeploymentParameters {
        location: request.location.clone(),
        project_name: names.final_project_name.clone(),
        sql_admin_password: request.sql_admin_password.clone(),
    };
    let outputs = cloud
        .deploy_template(
            &names.resource_group_name,
            &request.deployment_name,
            &request.template_file,
            &parameters,
        )
        .map_err(|e| {
            Error::cloud_provision_failed(
                &names.resource_group_name,
                "deploy_template",
                failure_text(&e),
            )
        })?;

    if outputs.storage_account_name != names.storage_account_name {
        let warning = format!(
            "Template provisioned storage account '{}' but '{}' was the name checked for availability",
            outputs.storage_account_name, names.storage_account_name
        );
        log_status!("deploy", "Warning: {}", warning);
        report.resolution.warnings.push(warning);
        report.resolution.verified = false;
    }

    report.folders = create_placeholders(
        cloud,
        &outputs.storage_account_name,
        &request.data_container,
        &request.folders,
    );
    report.outputs = Some(outputs);

    let vars = [
        (TemplateVars::SUBSCRIPTION_ID, report.identity.subscription_id.as_str()),
        (TemplateVars::TENANT_ID, report.identity.tenant_id.as_str()),
        (TemplateVars::RESOURCE_GROUP, names.resource_group_name.as_str()),
        (TemplateVars::STORAGE_ACCOUNT, report.storage_account_name()),
        (TemplateVars::WORKSPACE, report.workspace_name()),
    ];
    let portal_url = template::render(&request.portal_url, &vars);
    let studio_url = template::render(&request.studio_url, &vars);
    report.portal_url = Some(portal_url);
    report.studio_url = Some(studio_url);

    Ok(report)
}

/// Best-effort: every folder is attempted, failures are recorded.
fn create_placeholders<C: Cloud + ?Sized>(
    cloud: &C,
    storage_account: &str,
    container: &str,
    folders: &[String],
) -> Vec<FolderOutcome> {
    folders
        .iter()
        .map(|folder| {
            match cloud.upload_placeholder(storage_account, container, folder) {
                Ok(()) => {
                    log_status!("deploy", "Created folder {}/{}", container, folder);
                    FolderOutcome {
                        folder: folder.clone(),
                        created: true,
                        error: None,
                    }
                }
                Err(e) => {
                    let text = failure_text(&e);
                    log_status!(
                        "deploy",
                        "Could not create folder {}/{}: {}",
                        container,
                        folder,
                        text
                    );
                    FolderOutcome {
                        folder: folder.clone(),
                        created: false,
                        error: Some(text),
                    }
                }
            }
        })
        .collect()
}

fn failure_text(err: &Error) -> String {
    err.details
        .get("stderr")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| err.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::{IdentityProvider, Provisioner};
    use crate::naming::NameAvailability;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct FakeCloud {
        logged_out: bool,
        taken: Vec<String>,
        fail_group: bool,
        fail_deploy: bool,
        fail_folder: Option<String>,
        /// Storage account the template reports; defaults to the last name
        /// reported available.
        provisioned_storage: Option<String>,
        last_available: RefCell<Option<String>>,
        calls: RefCell<Vec<String>>,
    }

    impl IdentityProvider for FakeCloud {
        fn current_identity(&self) -> Result<Identity> {
            self.calls.borrow_mut().push("identity".to_string());
            if self.logged_out {
                return Err(Error::cloud_not_authenticated("Please run 'az login'"));
            }
            Ok(Identity {
                user: "dev@example.com".to_string(),
                subscription_id: "sub-1".to_string(),
                subscription_name: "Lab".to_string(),
                tenant_id: "tenant-1".to_string(),
            })
        }
    }

    impl NameAvailability for FakeCloud {
        fn is_available(&self, name: &str) -> Result<bool> {
            self.calls.borrow_mut().push(format!("check {}", name));
            let available = !self.taken.iter().any(|t| t == name);
            if available {
                *self.last_available.borrow_mut() = Some(name.to_string());
            }
            Ok(available)
        }
    }

    impl Provisioner for FakeCloud {
        fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("group {} {}", name, location));
            if self.fail_group {
                return Err(Error::internal_io("quota exceeded", None));
            }
            Ok(())
        }

        fn deploy_template(
            &self,
            resource_group: &str,
            _deployment_name: &str,
            _template_file: &Path,
            parameters: &DeploymentParameters,
        ) -> Result<DeploymentOutputs> {
            self.calls
                .borrow_mut()
                .push(format!("deploy {} {}", resource_group, parameters.project_name));
            if self.fail_deploy {
                return Err(Error::cloud_command_failed(
                    crate::error::CloudCommandFailedDetails {
                        command: "az deployment group create".to_string(),
                        exit_code: 1,
                        stderr: "InvalidTemplate".to_string(),
                    },
                ));
            }
            let storage = self
                .provisioned_storage
                .clone()
                .or_else(|| self.last_available.borrow().clone())
                .unwrap_or_default();
            Ok(DeploymentOutputs {
                storage_account_name: storage.clone(),
                synapse_workspace_name: format!("{}-syn", parameters.project_name),
                synapse_web_endpoint: "https://web.azuresynapse.net".to_string(),
                data_container_path: format!("abfss://data@{}.dfs.core.windows.net", storage),
            })
        }

        fn upload_placeholder(&self, account: &str, container: &str, folder: &str) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("folder {} {} {}", account, container, folder));
            if self.fail_folder.as_deref() == Some(folder) {
                return Err(Error::internal_io("forbidden", None));
            }
            Ok(())
        }
    }

    fn request(dir: &Path) -> ProvisionRequest {
        let template = dir.join("main.bicep");
        std::fs::write(&template, "// template").unwrap();
        let mut request = ProvisionRequest::from_defaults(
            ProjectName::parse("cdc-lab").unwrap(),
            "Str0ng!Passw0rd".to_string(),
            "synapse-lab-test".to_string(),
            &Defaults::default(),
        );
        request.template_file = template;
        request
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn password_policy() {
        assert!(validate_sql_password("Str0ng!Passw0rd").is_ok());
        assert!(validate_sql_password("abcDEF12").is_ok());
        assert!(validate_sql_password("Sh0rt!").is_err());
        assert!(validate_sql_password("alllowercase").is_err());
        assert!(validate_sql_password("lower123456").is_err());
        assert!(validate_sql_password("My-SqlAdminUser-1").is_err());
        assert!(validate_sql_password(&"Aa1!".repeat(33)).is_err());
    }

    #[test]
    fn full_run_uses_suffixed_names_everywhere() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            taken: vec!["cdclabst".to_string()],
            ..Default::default()
        };

        let report = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap();

        assert_eq!(report.resolution.names.resource_group_name, "rg-cdc-lab1");
        assert_eq!(report.storage_account_name(), "cdclabst1");
        assert_eq!(report.workspace_name(), "cdc-lab1-syn");
        assert_eq!(report.folders.len(), 3);
        assert!(report.folders.iter().all(|f| f.created));

        let calls = cloud.calls.borrow();
        assert_eq!(calls[0], "identity");
        assert!(calls.contains(&"group rg-cdc-lab1 eastus".to_string()));
        assert!(calls.contains(&"deploy rg-cdc-lab1 cdc-lab1".to_string()));
        assert!(calls.contains(&"folder cdclabst1 data metadata".to_string()));

        let studio = report.studio_url.unwrap();
        assert!(studio.contains("sub-1"));
        assert!(studio.contains("cdc-lab1-syn"));
        assert!(report.portal_url.unwrap().contains("rg-cdc-lab1"));
    }

    #[test]
    fn provisioned_storage_mismatch_clears_verified() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            provisioned_storage: Some("cdclab1st".to_string()),
            taken: vec!["cdclabst".to_string()],
            ..Default::default()
        };

        let report = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap();

        assert_eq!(report.resolution.names.storage_account_name, "cdclabst1");
        assert_eq!(report.storage_account_name(), "cdclab1st");
        assert!(!report.resolution.verified);
        assert!(report
            .resolution
            .warnings
            .iter()
            .any(|w| w.contains("cdclab1st") && w.contains("cdclabst1")));
        assert!(calls_contain(&cloud, "folder cdclab1st data source"));
    }

    #[test]
    fn matching_storage_keeps_verified() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud::default();

        let report = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap();

        assert_eq!(report.storage_account_name(), "cdclabst");
        assert!(report.resolution.verified);
        assert!(report.resolution.warnings.is_empty());
    }

    fn calls_contain(cloud: &FakeCloud, call: &str) -> bool {
        cloud.calls.borrow().iter().any(|c| c == call)
    }

    #[test]
    fn dry_run_stops_after_resolution() {
        let cloud = FakeCloud::default();
        let mut req = request(tempfile::TempDir::new().unwrap().path());
        req.dry_run = true;
        req.sql_admin_password = String::new();
        req.template_file = PathBuf::from("/nonexistent/main.bicep");

        let report = run_with(&cloud, &req, &mut rng()).unwrap();

        assert!(report.dry_run);
        assert!(report.outputs.is_none());
        assert_eq!(
            *cloud.calls.borrow(),
            vec!["identity".to_string(), "check cdclabst".to_string()]
        );
    }

    #[test]
    fn unauthenticated_session_aborts_before_probing() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            logged_out: true,
            ..Default::default()
        };

        let err = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap_err();

        assert_eq!(err.code.as_str(), "cloud.not_authenticated");
        assert_eq!(*cloud.calls.borrow(), vec!["identity".to_string()]);
    }

    #[test]
    fn weak_password_fails_before_any_cloud_call() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud::default();
        let mut req = request(dir.path());
        req.sql_admin_password = "weak".to_string();

        let err = run_with(&cloud, &req, &mut rng()).unwrap_err();

        assert_eq!(err.details["field"], "sql_admin_password");
        assert!(cloud.calls.borrow().is_empty());
    }

    #[test]
    fn missing_template_is_validation_error() {
        let cloud = FakeCloud::default();
        let mut req = request(tempfile::TempDir::new().unwrap().path());
        req.template_file = PathBuf::from("/nonexistent/main.bicep");

        let err = run_with(&cloud, &req, &mut rng()).unwrap_err();
        assert_eq!(err.details["field"], "template");
    }

    #[test]
    fn deployment_failure_is_fatal_and_skips_folders() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            fail_deploy: true,
            ..Default::default()
        };

        let err = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap_err();

        assert_eq!(err.code.as_str(), "cloud.provision_failed");
        assert_eq!(err.details["step"], "deploy_template");
        assert_eq!(err.details["error"], "InvalidTemplate");
        assert!(!cloud.calls.borrow().iter().any(|c| c.starts_with("folder")));
        let deploys = cloud
            .calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("deploy"))
            .count();
        assert_eq!(deploys, 1);
    }

    #[test]
    fn resource_group_failure_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            fail_group: true,
            ..Default::default()
        };

        let err = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap_err();
        assert_eq!(err.details["step"], "create_resource_group");
    }

    #[test]
    fn folder_failure_is_recorded_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let cloud = FakeCloud {
            fail_folder: Some("destination".to_string()),
            ..Default::default()
        };

        let report = run_with(&cloud, &request(dir.path()), &mut rng()).unwrap();

        let dest = report
            .folders
            .iter()
            .find(|f| f.folder == "destination")
            .unwrap();
        assert!(!dest.created);
        assert_eq!(dest.error.as_deref(), Some("IO error"));
        assert!(report.folders.iter().filter(|f| f.created).count() == 2);
    }
}

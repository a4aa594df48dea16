use std::cell::RefCell;
use std::path::Path;

use chrono::{Local, TimeZone};
use rand::rngs::StdRng;
use rand::SeedableRng;

use synapse_lab::azure::{
    DeploymentOutputs, DeploymentParameters, Identity, IdentityProvider, Provisioner,
};
use synapse_lab::defaults::builtin_defaults;
use synapse_lab::naming::{NameAvailability, ProjectName};
use synapse_lab::provision::{self, ProvisionRequest};
use synapse_lab::{summary, ErrorCode, Result};

/// The template provisions whichever storage name was last reported free,
/// unless `provisioned_storage` says otherwise.
#[derive(Default)]
struct LabCloud {
    taken: Vec<String>,
    provisioned_storage: Option<String>,
    last_free: RefCell<Option<String>>,
    log: RefCell<Vec<String>>,
}

impl IdentityProvider for LabCloud {
    fn current_identity(&self) -> Result<Identity> {
        Ok(Identity {
            user: "ops@contoso.com".to_string(),
            subscription_id: "0000-1111".to_string(),
            subscription_name: "Data Lab".to_string(),
            tenant_id: "contoso".to_string(),
        })
    }
}

impl NameAvailability for LabCloud {
    fn is_available(&self, name: &str) -> Result<bool> {
        let free = !self.taken.iter().any(|t| t == name);
        if free {
            *self.last_free.borrow_mut() = Some(name.to_string());
        }
        Ok(free)
    }
}

impl Provisioner for LabCloud {
    fn create_resource_group(&self, name: &str, _location: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("group:{}", name));
        Ok(())
    }

    fn deploy_template(
        &self,
        resource_group: &str,
        _deployment_name: &str,
        _template_file: &Path,
        parameters: &DeploymentParameters,
    ) -> Result<DeploymentOutputs> {
        self.log.borrow_mut().push(format!("deploy:{}", resource_group));
        let storage = self
            .provisioned_storage
            .clone()
            .or_else(|| self.last_free.borrow().clone())
            .unwrap_or_default();
        Ok(DeploymentOutputs {
            synapse_workspace_name: format!("{}-syn", parameters.project_name),
            synapse_web_endpoint: format!(
                "https://web.azuresynapse.net?workspace={}-syn",
                parameters.project_name
            ),
            data_container_path: format!("abfss://data@{}.dfs.core.windows.net", storage),
            storage_account_name: storage,
        })
    }

    fn upload_placeholder(&self, _account: &str, _container: &str, folder: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("folder:{}", folder));
        Ok(())
    }
}

fn request(template: &Path, dry_run: bool) -> ProvisionRequest {
    let mut request = ProvisionRequest::from_defaults(
        ProjectName::parse("cdc-lab").unwrap(),
        "Sup3r-Secret!".to_string(),
        "synapse-lab-test".to_string(),
        &builtin_defaults(),
    );
    request.template_file = template.to_path_buf();
    request.dry_run = dry_run;
    request
}

#[test]
fn taken_name_moves_to_counter_and_lands_in_summary() {
    let dir = tempfile::TempDir::new().unwrap();
    let template = dir.path().join("main.bicep");
    std::fs::write(&template, "// template").unwrap();

    let cloud = LabCloud {
        taken: vec!["cdclabst".to_string()],
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);

    let report = provision::run_with(&cloud, &request(&template, false), &mut rng).unwrap();

    assert_eq!(report.resolution.names.final_project_name, "cdc-lab1");
    assert_eq!(
        *cloud.log.borrow(),
        vec![
            "group:rg-cdc-lab1",
            "deploy:rg-cdc-lab1",
            "folder:source",
            "folder:destination",
            "folder:metadata",
        ]
    );

    let summary_path = dir.path().join("deployment-info.txt");
    let at = Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    summary::write(&summary_path, &report, at).unwrap();

    let text = std::fs::read_to_string(&summary_path).unwrap();
    assert!(text.contains("RESOURCE_GROUP=rg-cdc-lab1\n"));
    assert!(text.contains("STORAGE_ACCOUNT=cdclabst1\n"));
    assert!(text.contains("SYNAPSE_WORKSPACE=cdc-lab1-syn\n"));
    assert!(text.contains("DEPLOYED_BY=ops@contoso.com\n"));
    assert!(text.contains("NAME_VERIFIED=true\n"));
}

#[test]
fn summary_marks_unchecked_storage_name_unverified() {
    let dir = tempfile::TempDir::new().unwrap();
    let template = dir.path().join("main.bicep");
    std::fs::write(&template, "// template").unwrap();

    let cloud = LabCloud {
        taken: vec!["cdclabst".to_string()],
        provisioned_storage: Some("cdclab1st".to_string()),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);

    let report = provision::run_with(&cloud, &request(&template, false), &mut rng).unwrap();
    assert!(!report.resolution.verified);

    let at = Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    let text = summary::render(&report, at);
    assert!(text.contains("STORAGE_ACCOUNT=cdclab1st\n"));
    assert!(text.contains("NAME_VERIFIED=false\n"));
}

#[test]
fn dry_run_touches_nothing() {
    let cloud = LabCloud::default();
    let mut rng = StdRng::seed_from_u64(1);
    let missing = Path::new("/nonexistent/main.bicep");

    let report = provision::run_with(&cloud, &request(missing, true), &mut rng).unwrap();

    assert!(report.dry_run);
    assert!(report.outputs.is_none());
    assert_eq!(report.resolution.names.storage_account_name, "cdclabst");
    assert!(cloud.log.borrow().is_empty());
}

#[test]
fn missing_template_is_a_validation_error() {
    let cloud = LabCloud::default();
    let mut rng = StdRng::seed_from_u64(1);
    let missing = Path::new("/nonexistent/main.bicep");

    let err = provision::run_with(&cloud, &request(missing, false), &mut rng).unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    assert!(cloud.log.borrow().is_empty());
}

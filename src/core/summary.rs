//! Deployment-info artifact: flat `KEY=value` lines written once at the end
//! of a successful run, for humans only.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::provision::DeploymentReport;
use crate::utils::io;

pub fn render(report: &DeploymentReport, generated_at: DateTime<Local>) -> String {
    let names = &report.resolution.names;
    let outputs = report.outputs.as_ref();

    let mut entries: Vec<(&str, String)> = vec![
        ("PROJECT_NAME", names.final_project_name.clone()),
        ("RESOURCE_GROUP", names.resource_group_name.clone()),
        ("STORAGE_ACCOUNT", report.storage_account_name().to_string()),
        ("SYNAPSE_WORKSPACE", report.workspace_name().to_string()),
        ("LOCATION", report.location.clone()),
        ("SUBSCRIPTION_ID", report.identity.subscription_id.clone()),
        ("SUBSCRIPTION_NAME", report.identity.subscription_name.clone()),
        ("DEPLOYED_BY", report.identity.user.clone()),
        ("NAME_VERIFIED", report.resolution.verified.to_string()),
    ];

    if let Some(outputs) = outputs {
        entries.push(("SYNAPSE_WEB_ENDPOINT", outputs.synapse_web_endpoint.clone()));
        entries.push(("DATA_CONTAINER_PATH", outputs.data_container_path.clone()));
    }
    if let Some(url) = &report.portal_url {
        entries.push(("PORTAL_URL", url.clone()));
    }
    if let Some(url) = &report.studio_url {
        entries.push(("SYNAPSE_STUDIO_URL", url.clone()));
    }
    entries.push((
        "GENERATED_AT",
        generated_at.format("%Y-%m-%d %H:%M:%S %z").to_string(),
    ));

    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(key);
        out.push('=');
        out.push_str(&value.replace('\n', " "));
        out.push('\n');
    }
    out
}

pub fn write(path: &Path, report: &DeploymentReport, generated_at: DateTime<Local>) -> Result<()> {
    io::write_file_atomic(path, &render(report, generated_at), "write deployment summary")
}

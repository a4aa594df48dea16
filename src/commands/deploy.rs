use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use synapse_lab::defaults;
use synapse_lab::naming::ProjectName;
use synapse_lab::provision::{self, DeploymentReport, ProvisionRequest};
use synapse_lab::{log_status, paths, summary, validation, Error};

use super::CmdResult;
use crate::tty;

const PASSWORD_ENV: &str = "SYNAPSE_LAB_SQL_PASSWORD";

#[derive(Args)]
pub struct DeployArgs {
    /// Project name (prompted for when omitted on a terminal)
    #[arg(long)]
    pub project_name: Option<String>,

    /// Azure region (defaults to /defaults/location)
    #[arg(long)]
    pub location: Option<String>,

    /// Infrastructure template (defaults to /defaults/deploy/template_file)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Where to write the KEY=value deployment summary
    #[arg(long)]
    pub summary_file: Option<PathBuf>,

    /// Resolve names and stop before creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// SQL administrator password
    #[arg(
        long = "sql-password",
        env = PASSWORD_ENV,
        hide_env_values = true,
        hide = true
    )]
    pub sql_password: Option<String>,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    pub deployment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_file: Option<String>,
    pub report: DeploymentReport,
}

pub fn run(args: DeployArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let defaults = defaults::load_defaults();

    let project_name = read_project_name(args.project_name.as_deref())?;
    let sql_password = if args.dry_run {
        String::new()
    } else {
        read_sql_password(args.sql_password)?
    };

    let deployment_name = format!(
        "synapse-lab-{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    );

    let mut request =
        ProvisionRequest::from_defaults(project_name, sql_password, deployment_name, &defaults);
    if let Some(location) = args.location.as_deref() {
        request.location =
            validation::require_non_empty(location, "location", "Location cannot be empty")?
                .to_string();
    }
    if let Some(template) = args.template {
        request.template_file = template;
    }
    request.dry_run = args.dry_run;

    let az = global.az_cli(&defaults);
    let report = provision::run(&az, &request)?;

    let summary_file = if report.dry_run {
        None
    } else {
        let path = args
            .summary_file
            .unwrap_or_else(|| paths::expand(&defaults.deploy.summary_file));
        summary::write(&path, &report, chrono::Local::now())?;
        log_status!("deploy", "Deployment details saved to {}", path.display());
        Some(path.display().to_string())
    };

    Ok((
        DeployOutput {
            command: if report.dry_run {
                "deploy.plan".to_string()
            } else {
                "deploy.run".to_string()
            },
            deployment_name: request.deployment_name,
            summary_file,
            report,
        },
        0,
    ))
}

/// Use the flag when given; otherwise prompt until a valid name is entered.
fn read_project_name(flag: Option<&str>) -> synapse_lab::Result<ProjectName> {
    if let Some(raw) = flag {
        return ProjectName::parse(raw);
    }

    if !tty::can_prompt() {
        return Err(Error::validation_missing_argument(vec!["project_name".to_string()])
            .with_hint("Pass --project-name when running non-interactively"));
    }

    loop {
        let raw = tty::prompt("Project name (3-20 chars, lowercase letters, digits, hyphens): ")?;
        match ProjectName::parse(&raw) {
            Ok(name) => return Ok(name),
            Err(e) => tty::status(&format!("Invalid project name: {}", invalid_reason(&e))),
        }
    }
}

/// Use the environment value when set; otherwise prompt until the password
/// satisfies the policy and is confirmed.
fn read_sql_password(from_env: Option<String>) -> synapse_lab::Result<String> {
    if let Some(password) = from_env {
        provision::validate_sql_password(&password)?;
        return Ok(password);
    }

    if !tty::can_prompt() {
        return Err(Error::validation_missing_argument(vec![PASSWORD_ENV.to_string()])
            .with_hint(format!("Set {} when running non-interactively", PASSWORD_ENV)));
    }

    loop {
        let password = tty::prompt_password("SQL admin password")?;
        if let Err(e) = provision::validate_sql_password(&password) {
            tty::status(&format!("Password rejected: {}", invalid_reason(&e)));
            continue;
        }
        let confirm = tty::prompt_password("Confirm password")?;
        if confirm != password {
            tty::status("Passwords do not match");
            continue;
        }
        return Ok(password);
    }
}

fn invalid_reason(err: &Error) -> &str {
    err.details
        .get("problem")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(err.message.as_str())
}

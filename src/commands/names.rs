use clap::{Args, Subcommand};
use serde::Serialize;

use synapse_lab::defaults;
use synapse_lab::naming::{self, NameSet, ProjectName, Resolution, ResolvePolicy, Suffix};
use synapse_lab::validation;

use super::CmdResult;

/// Upper bound accepted for `--max-attempts`.
const MAX_ATTEMPTS_LIMIT: u32 = 100;

#[derive(Args)]
pub struct NamesArgs {
    #[command(subcommand)]
    command: NamesCommand,
}

#[derive(Subcommand)]
enum NamesCommand {
    /// Derive the resource names for a project without contacting Azure
    Derive {
        /// Project name (3-20 chars, lowercase letters, digits and hyphens)
        project: String,

        /// Suffix to append: a number or 4 lowercase letters/digits
        #[arg(long)]
        suffix: Option<String>,
    },
    /// Pick the first name set whose storage account name is available
    Resolve {
        /// Project name (3-20 chars, lowercase letters, digits and hyphens)
        project: String,

        /// Availability checks before falling back to a random suffix
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NamesOutput {
    Derive(DeriveOutput),
    Resolve(ResolveOutput),
}

#[derive(Debug, Serialize)]
pub struct DeriveOutput {
    command: String,
    project: ProjectName,
    suffix: Suffix,
    names: NameSet,
}

#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    command: String,
    max_attempts: u32,
    resolution: Resolution,
}

pub fn run(args: NamesArgs, global: &crate::commands::GlobalArgs) -> CmdResult<NamesOutput> {
    match args.command {
        NamesCommand::Derive { project, suffix } => derive(&project, suffix.as_deref()),
        NamesCommand::Resolve {
            project,
            max_attempts,
        } => resolve(&project, max_attempts, global),
    }
}

fn derive(project: &str, suffix: Option<&str>) -> CmdResult<NamesOutput> {
    let project = ProjectName::parse(project)?;
    let suffix = match suffix {
        Some(raw) => Suffix::from_input(raw)?,
        None => Suffix::None,
    };
    let names = naming::derive(&project, &suffix);

    Ok((
        NamesOutput::Derive(DeriveOutput {
            command: "names.derive".to_string(),
            project,
            suffix,
            names,
        }),
        0,
    ))
}

fn resolve(
    project: &str,
    max_attempts: Option<u32>,
    global: &crate::commands::GlobalArgs,
) -> CmdResult<NamesOutput> {
    let project = ProjectName::parse(project)?;
    let defaults = defaults::load_defaults();

    let mut policy = ResolvePolicy::from(&defaults.naming);
    if let Some(n) = max_attempts {
        policy.max_attempts = validation::require_in_range(n, 1, MAX_ATTEMPTS_LIMIT, "max_attempts")?;
    }

    let az = global.az_cli(&defaults);
    let resolution = naming::resolve_with(&project, &az, &policy, &mut rand::rng());

    Ok((
        NamesOutput::Resolve(ResolveOutput {
            command: "names.resolve".to_string(),
            max_attempts: policy.max_attempts,
            resolution,
        }),
        0,
    ))
}

use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, deploy, names, sample_data};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "synapse-lab")]
#[command(version = VERSION)]
#[command(about = "Provision the Azure Synapse CDC lab and generate its sample data")]
struct Cli {
    /// Azure CLI binary to invoke (overrides /defaults/cli/program)
    #[arg(long, global = true, env = "SYNAPSE_LAB_AZ")]
    az: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive or resolve globally-unique resource names
    Names(names::NamesArgs),
    /// Provision the lab resources in Azure
    Deploy(deploy::DeployArgs),
    /// Generate CSV datasets for the CDC scenarios
    SampleData(sample_data::SampleDataArgs),
    /// Manage global synapse-lab configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { az_program: cli.az };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    // Nothing left to report to if stdout itself is gone.
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use synapse_lab::sample_data::{self, SampleDataReport, DEFAULT_SEED};

use super::CmdResult;

#[derive(Args)]
pub struct SampleDataArgs {
    /// Directory that receives the two scenario folders
    #[arg(long, default_value = "sample-data")]
    pub output_dir: PathBuf,

    /// RNG seed; the same seed always yields the same files
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[derive(Serialize)]
pub struct SampleDataOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: SampleDataReport,
}

pub fn run_json(args: SampleDataArgs) -> CmdResult<SampleDataOutput> {
    let report = sample_data::generate(&args.output_dir, args.seed)?;

    Ok((
        SampleDataOutput {
            command: "sample-data.generate".to_string(),
            report,
        },
        0,
    ))
}

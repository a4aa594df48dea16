pub type CmdResult<T> = synapse_lab::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Override for the `az` binary, taking precedence over `/defaults/cli/program`.
    pub az_program: Option<String>,
}

impl GlobalArgs {
    pub(crate) fn az_cli(&self, defaults: &synapse_lab::defaults::Defaults) -> synapse_lab::azure::AzCli {
        let program = self
            .az_program
            .clone()
            .unwrap_or_else(|| defaults.cli.program.clone());
        synapse_lab::azure::AzCli::new(program)
    }
}

pub mod config;
pub mod deploy;
pub mod names;
pub mod sample_data;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run_json($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (synapse_lab::Result<serde_json::Value>, i32) {
    crate::tty::status("synapse-lab is working...");

    match command {
        // Commands without global context
        crate::Commands::SampleData(args) => dispatch!(args, sample_data),

        // Commands with global context
        crate::Commands::Names(args) => dispatch!(args, global, names),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}

//! Library part of the `simrun` driver: CLI option parsing, sub-command
//! dispatch, and the default plugin registry wiring.

pub use cli::*;
pub use cmds::*;

mod cli;
mod cmds;
pub mod error;
mod registry;
mod schemas;

use eyre::Result;

/// Dispatch a parsed top-level sub-command.
pub fn handle_subcmd(subcmd: &SubCommand) -> Result<()> {
    match subcmd {
        SubCommand::Run(opts) => match &opts.subcmd {
            RunSubCommand::Jobs(jobs_opts) => run_jobs(jobs_opts),
            RunSubCommand::List => run_list(),
        },
        SubCommand::List(opts) => list(opts),
        SubCommand::Show(opts) => show(opts),
        SubCommand::Template(opts) => template(opts),
        SubCommand::Config(opts) => config(&opts.subcmd),
        SubCommand::Init(opts) => init(opts),
    }
}

//! Entry point for the `simrun` job orchestrator.

use clap::{crate_authors, crate_description, crate_version, Parser};
use eyre::Result;
use simrun_common::LoggingOptions;
use tracing::trace;

use simrun::{handle_subcmd, Opts};

pub const NAME: &str = env!("CARGO_BIN_NAME");
pub const VERSION: &str = crate_version!();
pub const AUTHORS: &str = crate_authors!();

fn main() -> Result<()> {
    let opts = Opts::parse();

    simrun_common::init_logging(&LoggingOptions {
        verbose: opts.verbose,
        log_file: opts.log_file.clone(),
        log_json: opts.log_json,
        suppress_warnings: opts.suppress_warnings,
    })?;

    banner();

    trace!("dispatching sub-command");
    handle_subcmd(&opts.subcmd)
}

fn banner() {
    eprintln!("{NAME}/{VERSION} by {AUTHORS}\n{}", crate_description!());
}

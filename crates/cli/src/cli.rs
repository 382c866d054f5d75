//! All top-level commands and sub-commands for the `simrun` driver.
//!
//! - `run jobs <name>` / `run jobs --list` / `run list`
//! - `list [namespace]`
//! - `show <namespace.name>`
//! - `template <namespace.name>`
//! - `config show` / `config set` / `config reset`
//! - `init [--force]`

use std::path::PathBuf;

use clap::{crate_description, crate_name, crate_version, Parser};

/// CLI options.
#[derive(Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!())]
pub struct Opts {
    /// Verbose mode (forces the `debug` log level).
    #[clap(short, long)]
    pub verbose: bool,
    /// Append structured logs to this file in addition to stderr.
    #[clap(long)]
    pub log_file: Option<String>,
    /// Emit logs as JSON lines instead of human-readable text.
    #[clap(long)]
    pub log_json: bool,
    /// Raise the log level floor to `error`.
    #[clap(long)]
    pub suppress_warnings: bool,
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Execute or enumerate jobs
    Run(RunOpts),
    /// Enumerate registry contents
    List(ListOpts),
    /// Print a plugin's schema defaults
    Show(ShowOpts),
    /// Emit a skeleton YAML for a plugin's schema
    Template(TemplateOpts),
    /// Inspect or modify the resolved configuration
    Config(ConfigOpts),
    /// Create a project skeleton in the workspace
    Init(InitOpts),
}

#[derive(Debug, Parser)]
pub struct RunOpts {
    #[clap(subcommand)]
    pub subcmd: RunSubCommand,
}

#[derive(Debug, Parser)]
pub enum RunSubCommand {
    /// Locate, expand, validate, and execute job(s)
    Jobs(RunJobsOpts),
    /// Enumerate registered engines
    List,
}

#[derive(Debug, Parser)]
pub struct RunJobsOpts {
    /// Job name (resolved under `paths.config_dirs`) or path to a job-list file
    pub name: Option<String>,
    /// Enumerate discoverable job names instead of running anything
    #[clap(long)]
    pub list: bool,
    /// Perform steps 1-3 and write snapshots only; no engine is invoked
    #[clap(long)]
    pub dry_run: bool,
    /// Resume from a previous session manifest, skipping succeeded jobs
    #[clap(long)]
    pub resume: bool,
    /// Path to the session manifest used for `--resume` (also written fresh)
    #[clap(long, default_value = "session_manifest.json")]
    pub manifest_path: PathBuf,
    /// Abort the whole session on the first job failure
    #[clap(long)]
    pub fail_fast: bool,
}

#[derive(Debug, Parser)]
pub struct ListOpts {
    /// Restrict to one registry namespace (`engine`, `model`, `backend`, ...)
    pub namespace: Option<String>,
}

#[derive(Debug, Parser)]
pub struct ShowOpts {
    /// `<namespace>.<name>`, e.g. `model.van_der_pol`
    pub target: String,
}

#[derive(Debug, Parser)]
pub struct TemplateOpts {
    /// `<namespace>.<name>`, e.g. `engine.sde`
    pub target: String,
}

#[derive(Debug, Parser)]
pub struct ConfigOpts {
    #[clap(subcommand)]
    pub subcmd: ConfigSubCommand,
}

#[derive(Debug, Parser)]
pub enum ConfigSubCommand {
    /// Print the resolved configuration
    Show {
        /// Show only the layered system configuration
        #[clap(long)]
        system: bool,
        /// Show only the global plugin configuration file
        #[clap(long)]
        global: bool,
    },
    /// Write a key to the user config file
    Set { key: String, value: String },
    /// Restore the user config file to package defaults
    Reset,
}

#[derive(Debug, Parser)]
pub struct InitOpts {
    /// Overwrite an existing project skeleton
    #[clap(long)]
    pub force: bool,
}

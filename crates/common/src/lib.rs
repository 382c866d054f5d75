//! Shared plumbing for the simrun workspace: logging setup, OS-appropriate
//! path resolution, and the deep-merge helper used by the configuration
//! loader.

mod logging;
mod merge;
mod paths;

pub use logging::{init_logging, LoggingOptions};
pub use merge::deep_merge;
pub use paths::{default_config_dir, AppPaths};

pub fn version() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

//! OS-appropriate location of the user's site defaults file.
//!
//! Mirrors the base-directory resolution used throughout the configuration
//! loader: on non-Windows platforms the user site file lives at
//! `$HOME/.config/<app>/defaults.yaml`; on Windows at
//! `%APPDATA%/<app>/defaults.yaml`.

use std::path::PathBuf;

use directories::BaseDirs;
use tracing::debug;

/// Directory tag under which simrun stores its user-level files.
pub const APP_TAG: &str = "simrun";

/// Bundle of resolved, process-wide filesystem locations.
#[derive(Clone, Debug)]
pub struct AppPaths {
    pub config_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        AppPaths {
            config_dir: default_config_dir(),
        }
    }

    pub fn user_defaults_file(&self) -> PathBuf {
        self.config_dir.join("defaults.yaml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the user-level config directory for the current platform.
#[tracing::instrument]
pub fn default_config_dir() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        #[cfg(windows)]
        {
            let dir = base.config_dir().join(APP_TAG);
            debug!(?dir, "resolved windows config dir");
            return dir;
        }
        #[cfg(not(windows))]
        {
            let dir = base.home_dir().join(".config").join(APP_TAG);
            debug!(?dir, "resolved config dir");
            return dir;
        }
    }
    // No base dirs available (e.g. stripped-down containers); fall back to
    // the current directory rather than panicking.
    PathBuf::from(".").join(format!(".{APP_TAG}"))
}

//! Layered configuration loader (`spec.md` §4.2): package defaults, user
//! site file, an env-pointed file, system overrides, and (at the job level,
//! applied later by the scheduler) per-job overrides — merged in that order
//! with `simrun_common::deep_merge`, later layers winning.
//!
//! Also resolves a bare job name to a file under one of the configured
//! `config_dirs`, per `spec.md` §6's `run jobs <name>` form.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::schema::{JobConfig, SystemConfig};

pub const ENV_SYSTEM_PARAMS: &str = "SIMRUN_SYSTEM_PARAMS";
pub const ENV_DEFAULTS_FILE: &str = "SIMRUN_DEFAULTS_FILE";
pub const ENV_CONFIG: &str = "SIMRUN_CONFIG";

const PACKAGE_DEFAULTS_YAML: &str = r#"
paths:
  output_dir: "./runs"
  global_file: "global.yaml"
  plugin_dirs: []
  config_dirs: ["."]
auto_save_results: true
parameter_scan:
  enabled: false
  method: cartesian
  numbered_outputs: true
progress_update_interval: 1.0
"#;

/// Build the effective `SystemConfig` by merging, in increasing priority:
/// package defaults, the user's site file (`simrun_common::AppPaths`), the
/// file named by `SIMRUN_DEFAULTS_FILE`, and the inline YAML named by
/// `SIMRUN_SYSTEM_PARAMS`. `SIMRUN_CONFIG`, if set, takes the place of the
/// user site file entirely.
pub fn load_system_config() -> CoreResult<SystemConfig> {
    let mut merged: serde_yaml::Value = serde_yaml::from_str(PACKAGE_DEFAULTS_YAML)
        .map_err(|e| CoreError::ConfigParse(format!("parsing built-in defaults: {e}")))?;

    let user_file = match std::env::var(ENV_CONFIG) {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => Some(simrun_common::AppPaths::new().user_defaults_file()),
    };
    if let Some(path) = user_file {
        merged = merge_layer_from_file(merged, &path, false)?;
    }

    if let Ok(path) = std::env::var(ENV_DEFAULTS_FILE) {
        merged = merge_layer_from_file(merged, Path::new(&path), true)?;
    }

    if let Ok(inline) = std::env::var(ENV_SYSTEM_PARAMS) {
        let patch: serde_yaml::Value = serde_yaml::from_str(&inline).map_err(|e| {
            CoreError::ConfigParse(format!("parsing {ENV_SYSTEM_PARAMS}: {e}"))
        })?;
        merged = simrun_common::deep_merge(&merged, &patch);
    }

    let system: SystemConfig = serde_yaml::from_value(merged)
        .map_err(|e| CoreError::ConfigParse(format!("building effective system config: {e}")))?;
    system.validate()?;
    Ok(system)
}

fn merge_layer_from_file(
    base: serde_yaml::Value,
    path: &Path,
    required: bool,
) -> CoreResult<serde_yaml::Value> {
    match std::fs::read_to_string(path) {
        Ok(body) => {
            let patch: serde_yaml::Value = serde_yaml::from_str(&body).map_err(|e| {
                CoreError::ConfigParse(format!("parsing {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "merged configuration layer");
            Ok(simrun_common::deep_merge(&base, &patch))
        }
        Err(e) if required => Err(CoreError::ConfigParse(format!(
            "reading required config file {}: {e}",
            path.display()
        ))),
        Err(_) => {
            warn!(path = %path.display(), "optional configuration layer not found, skipping");
            Ok(base)
        }
    }
}

/// Resolve a bare job name to a file path, searching `<dir>/jobs/<name>.yaml`
/// then `<dir>/jobs/<name>.yml` across `config_dirs` in order.
pub fn resolve_job_file(config_dirs: &[String], name: &str) -> CoreResult<PathBuf> {
    let mut searched = Vec::new();
    for dir in config_dirs {
        for ext in ["yaml", "yml"] {
            let candidate = Path::new(dir).join("jobs").join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
    }
    Err(CoreError::JobNotFound {
        name: name.to_string(),
        searched,
        known: known_job_names(config_dirs),
    })
}

/// List discoverable job names across `config_dirs`, for `run jobs --list`.
pub fn known_job_names(config_dirs: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    for dir in config_dirs {
        let jobs_dir = Path::new(dir).join("jobs");
        let Ok(entries) = std::fs::read_dir(&jobs_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

/// Load and parse a single job file.
pub fn load_job_file(path: &Path) -> CoreResult<JobConfig> {
    let body = std::fs::read_to_string(path)
        .map_err(|e| CoreError::ConfigParse(format!("reading {}: {e}", path.display())))?;
    let job: JobConfig = serde_yaml::from_str(&body)
        .map_err(|e| CoreError::ConfigParse(format!("parsing {}: {e}", path.display())))?;
    job.validate()?;
    Ok(job)
}

/// Load a job list file — a YAML document containing a top-level sequence
/// of job definitions, per `spec.md` §6's `run jobs <file>` form.
pub fn load_job_list_file(path: &Path) -> CoreResult<Vec<JobConfig>> {
    let body = std::fs::read_to_string(path)
        .map_err(|e| CoreError::ConfigParse(format!("reading {}: {e}", path.display())))?;
    let jobs: Vec<JobConfig> = serde_yaml::from_str(&body)
        .map_err(|e| CoreError::ConfigParse(format!("parsing {}: {e}", path.display())))?;
    for job in &jobs {
        job.validate()?;
    }
    Ok(jobs)
}

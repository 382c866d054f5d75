//! `init [--force]`: scaffold a minimal project in the current directory.

use std::fs;
use std::path::Path;

use eyre::{eyre, Result};

use crate::cli::InitOpts;

const SYSTEM_YAML: &str = r#"paths:
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

const GLOBAL_YAML: &str = "{}\n";

const SAMPLE_JOB_YAML: &str = r#"name: demo
engine:
  sde:
    t0: 0.0
    dt: 0.01
    n_steps: 1000
plugins:
  model:
    van_der_pol:
      mu: 1.0
      sigma: 0.1
  integrator:
    euler_maruyama: {}
"#;

pub fn init(opts: &InitOpts) -> Result<()> {
    write_new(Path::new("system.yaml"), SYSTEM_YAML, opts.force)?;
    write_new(Path::new("global.yaml"), GLOBAL_YAML, opts.force)?;
    fs::create_dir_all("jobs")?;
    write_new(Path::new("jobs/demo.yaml"), SAMPLE_JOB_YAML, opts.force)?;
    println!("initialized project skeleton (system.yaml, global.yaml, jobs/demo.yaml)");
    Ok(())
}

fn write_new(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(eyre!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ));
    }
    fs::write(path, contents)?;
    Ok(())
}

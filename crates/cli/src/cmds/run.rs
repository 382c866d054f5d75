//! `run jobs` / `run list`.

use std::path::Path;

use eyre::Result;
use tracing::{info, warn};

use simrun_core::loader::{known_job_names, load_job_list_file, resolve_job_file};
use simrun_core::scheduler::{RunOptions, Scheduler, SchedulerEvent};
use simrun_core::{validator, JobConfig};

use crate::cli::RunJobsOpts;
use crate::error::report;
use crate::registry::build_registry;

pub fn run_jobs(opts: &RunJobsOpts) -> Result<()> {
    let system = simrun_core::loader::load_system_config().map_err(report)?;

    if opts.list {
        for name in known_job_names(&system.paths.config_dirs) {
            println!("{name}");
        }
        return Ok(());
    }

    let name = opts
        .name
        .as_deref()
        .ok_or_else(|| eyre::eyre!("`run jobs` requires a job name, or --list"))?;

    let jobs: Vec<JobConfig> = if Path::new(name).is_file() {
        load_job_list_file(Path::new(name)).map_err(report)?
    } else {
        let path = resolve_job_file(&system.paths.config_dirs, name).map_err(report)?;
        vec![simrun_core::loader::load_job_file(&path).map_err(report)?]
    };

    let expanded = expand_all(&jobs, &system)?;
    let validation = validator::validate(&expanded).map_err(report)?;

    let registry = build_registry().map_err(report)?;
    let scheduler = Scheduler::new(registry, system);

    let run_opts = RunOptions {
        dry_run: opts.dry_run,
        resume: opts.resume,
        manifest_path: opts.manifest_path.clone(),
        fail_fast: opts.fail_fast,
    };

    let results = scheduler
        .run(&expanded, &validation, run_opts, |event| log_event(&event))
        .map_err(report)?;

    let any_failed = results.iter().any(|r| !r.success);
    for r in &results {
        if r.success {
            info!(job = %r.job_name, run_id = %r.run_id, "job succeeded");
        } else {
            warn!(job = %r.job_name, error = ?r.error, "job failed");
        }
    }

    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}

pub fn run_list() -> Result<()> {
    let registry = build_registry().map_err(report)?;
    for name in registry.list(Some("engine")).get("engine").cloned().unwrap_or_default() {
        println!("{name}");
    }
    Ok(())
}

fn expand_all(jobs: &[JobConfig], system: &simrun_core::SystemConfig) -> Result<Vec<JobConfig>> {
    simrun_core::expander::expand_job_list(
        jobs,
        system.parameter_scan.enabled,
        system.parameter_scan.method,
        system.parameter_scan.numbered_outputs,
    )
    .map_err(report)
}

fn log_event(event: &SchedulerEvent) {
    match event {
        SchedulerEvent::JobStarted { index, name } => info!(index, job = %name, "job started"),
        SchedulerEvent::Progress(update) => info!(
            job = %update.job_name,
            percent = ?update.percent,
            message = %update.message,
            "progress"
        ),
        SchedulerEvent::JobFinished(result) => info!(job = %result.job_name, success = result.success, "job finished"),
        SchedulerEvent::JobSkippedResumed { name, .. } => info!(job = %name, "skipped (resume)"),
        SchedulerEvent::DryRunPlanned { name, run_dir, .. } => {
            info!(job = %name, run_dir = %run_dir.display(), "dry-run planned")
        }
    }
}

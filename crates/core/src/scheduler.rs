//! Serial scheduler core: the ten-step per-job lifecycle from `spec.md`
//! §4.6 (resolve input, allocate run dir, merge config, build plugins,
//! instantiate engine, write snapshot, run with progress callback, validate
//! result contract, route output, transition/report), dry-run mode, and
//! session-manifest-backed resumption.
//!
//! Deliberately synchronous and single-threaded — no actor framework, no
//! thread pool — per the non-goals in `spec.md` §1/§5. A state-machine
//! *shape* (pending/running/finished) is kept without an actor runtime
//! underneath it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::manifest::{JobStatus, RunManifest, SessionManifest};
use crate::plugins::{Engine, PluginSet, ProgressUpdate};
use crate::progress::{global_eta, JobProgressUpdate, ProgressRateLimiter};
use crate::registry::Registry;
use crate::result::JobResult;
use crate::schema::{JobConfig, SystemConfig};
use crate::snapshot::{write_snapshot, Snapshot};
use crate::validator::{ResolvedInput, ValidationReport};

pub struct RunOptions {
    pub dry_run: bool,
    pub resume: bool,
    pub manifest_path: PathBuf,
    /// When set, a runtime failure in one job aborts the rest of the
    /// session instead of the default "record Failed, keep going" policy
    /// (`spec.md` §7).
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            dry_run: false,
            resume: false,
            manifest_path: PathBuf::from("session_manifest.json"),
            fail_fast: false,
        }
    }
}

pub enum SchedulerEvent {
    JobStarted { index: usize, name: String },
    Progress(JobProgressUpdate),
    JobFinished(JobResult),
    JobSkippedResumed { index: usize, name: String },
    DryRunPlanned { index: usize, name: String, run_dir: PathBuf },
}

pub struct Scheduler {
    registry: Registry,
    system: SystemConfig,
}

impl Scheduler {
    pub fn new(registry: Registry, system: SystemConfig) -> Self {
        Scheduler { registry, system }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every job in `jobs`, in list order, against `validation` (the
    /// report produced by `crate::validator::validate` over the same,
    /// already-expanded job list).
    #[instrument(skip_all)]
    pub fn run(
        &self,
        jobs: &[JobConfig],
        validation: &ValidationReport,
        opts: RunOptions,
        mut emit: impl FnMut(SchedulerEvent),
    ) -> CoreResult<Vec<JobResult>> {
        let mut manifest = if opts.resume && opts.manifest_path.exists() {
            SessionManifest::load(&opts.manifest_path)?
        } else {
            SessionManifest::new(
                Uuid::new_v4().to_string(),
                Utc::now().to_rfc3339(),
                jobs.iter().map(|j| j.name.clone()),
            )
        };

        let mut results_by_job: BTreeMap<String, Arc<dyn crate::plugins::ResultObject>> =
            BTreeMap::new();
        let mut results_by_engine: BTreeMap<String, Arc<dyn crate::plugins::ResultObject>> =
            BTreeMap::new();
        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut completed_durations: Vec<f64> = Vec::new();
        let mut any_failed = false;

        for (index, job) in jobs.iter().enumerate() {
            if opts.resume && manifest.is_done(&job.name) {
                emit(SchedulerEvent::JobSkippedResumed {
                    index,
                    name: job.name.clone(),
                });
                continue;
            }

            let run_dir = allocate_run_dir(&self.system, job)?;

            if opts.dry_run {
                self.plan_dry_run(job, &run_dir, validation, &results_by_job, &results_by_engine)?;
                emit(SchedulerEvent::DryRunPlanned {
                    index,
                    name: job.name.clone(),
                    run_dir: run_dir.clone(),
                });
                let job_result =
                    JobResult::ok(index, job.name.clone(), run_dir, "dry_run".to_string());
                outcomes.push(job_result);
                continue;
            }

            emit(SchedulerEvent::JobStarted {
                index,
                name: job.name.clone(),
            });
            manifest.mark(&job.name, JobStatus::Running, Some(run_dir.clone()), None);
            manifest.save(&opts.manifest_path)?;

            let started = Instant::now();
            let outcome = self.run_one_job(
                index,
                job,
                &run_dir,
                validation,
                &results_by_job,
                &results_by_engine,
                jobs.len() - index - 1,
                &completed_durations,
                &mut emit,
            );
            let elapsed = started.elapsed().as_secs_f64();
            completed_durations.push(elapsed);

            match outcome {
                Ok((result_obj, job_result)) => {
                    let (engine_name, _) = job.engine_entry();
                    results_by_job.insert(job.name.clone(), result_obj.clone());
                    results_by_engine.insert(engine_name.to_lowercase(), result_obj);
                    manifest.mark(
                        &job.name,
                        JobStatus::Succeeded,
                        Some(run_dir.clone()),
                        Some(job_result.run_id.clone()),
                    );
                    manifest.save(&opts.manifest_path)?;
                    emit(SchedulerEvent::JobFinished(job_result.clone()));
                    outcomes.push(job_result);
                }
                Err((run_id, e)) => {
                    warn!(job = %job.name, error = %e, "job failed; continuing to next job");
                    any_failed = true;
                    let job_result = JobResult::failed(
                        index,
                        job.name.clone(),
                        run_dir.clone(),
                        run_id,
                        e.to_string(),
                    );
                    manifest.mark(&job.name, JobStatus::Failed, Some(run_dir), None);
                    manifest.save(&opts.manifest_path)?;
                    emit(SchedulerEvent::JobFinished(job_result.clone()));
                    outcomes.push(job_result);
                    if opts.fail_fast {
                        manifest.finish(true);
                        manifest.save(&opts.manifest_path)?;
                        return Err(e);
                    }
                }
            }
        }
        manifest.finish(any_failed);
        manifest.save(&opts.manifest_path)?;
        Ok(outcomes)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_one_job(
        &self,
        index: usize,
        job: &JobConfig,
        run_dir: &Path,
        validation: &ValidationReport,
        results_by_job: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
        results_by_engine: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
        jobs_remaining_after: usize,
        completed_durations: &[f64],
        emit: &mut impl FnMut(SchedulerEvent),
    ) -> Result<(Arc<dyn crate::plugins::ResultObject>, JobResult), (String, CoreError)> {
        let run_id = Uuid::new_v4().to_string();

        // Step 1: resolve input.
        let input = self
            .resolve_input(job, validation, results_by_job, results_by_engine)
            .map_err(|e| (run_id.clone(), e))?;

        // Step 2: run dir already allocated by the caller.
        std::fs::create_dir_all(run_dir).map_err(|e| {
            (
                run_id.clone(),
                CoreError::RuntimeIoError {
                    job: job.name.clone(),
                    detail: format!("creating run dir {}: {e}", run_dir.display()),
                },
            )
        })?;

        if let Err(e) = RunManifest::write(run_dir, &run_id, index, &job.name) {
            warn!(job = %job.name, error = %e, "failed to write run manifest");
        }

        // Step 3: merge this job's system override onto the process-wide
        // system config.
        let effective_system = self.merge_system_override(job);

        // Step 4: build the job's plugin set.
        let plugin_set = self
            .build_plugins(job, &effective_system)
            .map_err(|e| (run_id.clone(), e))?;

        // Step 5: instantiate the engine.
        let (engine_name, engine_params) = job.engine_entry();
        let mut engine = self
            .registry
            .create_engine(engine_name, engine_params, &plugin_set)
            .map_err(|e| (run_id.clone(), e))?;

        // Step 6: write the reproducibility snapshot (best-effort).
        let plugin_names: Vec<String> = plugin_set.keys().cloned().collect();
        write_snapshot(
            run_dir,
            &Snapshot {
                run_id: &run_id,
                job,
                engine_name,
                plugin_names,
                created_at: Utc::now().to_rfc3339(),
            },
        );

        // Step 7: run, with a rate-limited, panic-guarded progress callback.
        let jobs_total_hint = jobs_remaining_after + index + 1;
        let mut limiter = ProgressRateLimiter::new(effective_system.progress_update_interval);
        let job_name = job.name.clone();
        let mut forward = |update: ProgressUpdate| {
            let now = Instant::now();
            if let Some(job_eta) = limiter.should_emit(&update, now) {
                let global = global_eta(job_eta, completed_durations, jobs_remaining_after);
                emit(SchedulerEvent::Progress(JobProgressUpdate {
                    job_name: job_name.clone(),
                    job_index: index,
                    jobs_total: jobs_total_hint,
                    percent: update.percent,
                    message: update.message,
                    stage: update.stage,
                    job_eta_seconds: job_eta,
                    global_eta_seconds: global,
                }));
            }
        };
        let mut guarded = guarded_progress_cb(&mut forward);
        let progress_sink: Option<&mut dyn FnMut(ProgressUpdate)> =
            if engine.accepts_progress() {
                Some(&mut guarded)
            } else {
                debug!(job = %job.name, "engine does not accept progress updates");
                None
            };

        let result_obj = engine
            .run(input, progress_sink)
            .map_err(|e| (run_id.clone(), e))?;

        // Step 8: validate the result contract. `ResultObject` is enforced
        // at compile time by the trait bound on `Engine::run`'s return type;
        // this step only guards against an implementation returning data it
        // itself cannot describe.
        let _ = result_obj.metadata();

        // Step 9: route output. `save` receives <run_dir>/<output_label>
        // with no extension; the implementation appends its own.
        if self.system.auto_save_results || effective_system.auto_save_results {
            let save_path = run_dir.join(job.output_label());
            if let Err(e) = result_obj.save(&save_path) {
                warn!(job = %job.name, error = %e, "failed to save job result");
            }
        }
        let result_obj: Arc<dyn crate::plugins::ResultObject> = Arc::from(result_obj);

        // Step 10: transition/report is handled by the caller, which owns
        // the manifest and the outcome ledger.
        info!(job = %job.name, run_id, "job finished");
        let job_result = JobResult::ok(index, job.name.clone(), run_dir.to_path_buf(), run_id);
        Ok((result_obj, job_result))
    }

    /// Dry-run: steps 1-3 of the lifecycle plus a best-effort snapshot; no
    /// plugin is built and no engine is invoked (`spec.md` §4.6 "Dry-run").
    fn plan_dry_run(
        &self,
        job: &JobConfig,
        run_dir: &Path,
        validation: &ValidationReport,
        results_by_job: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
        results_by_engine: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
    ) -> CoreResult<()> {
        self.resolve_input(job, validation, results_by_job, results_by_engine)?;

        std::fs::create_dir_all(run_dir).map_err(|e| CoreError::RuntimeIoError {
            job: job.name.clone(),
            detail: format!("creating run dir {}: {e}", run_dir.display()),
        })?;

        let _effective_system = self.merge_system_override(job);

        let (engine_name, _) = job.engine_entry();
        write_snapshot(
            run_dir,
            &Snapshot {
                run_id: "dry_run",
                job,
                engine_name,
                plugin_names: Vec::new(),
                created_at: Utc::now().to_rfc3339(),
            },
        );
        Ok(())
    }

    fn resolve_input(
        &self,
        job: &JobConfig,
        validation: &ValidationReport,
        results_by_job: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
        results_by_engine: &BTreeMap<String, Arc<dyn crate::plugins::ResultObject>>,
    ) -> CoreResult<Option<Arc<dyn crate::plugins::ResultObject>>> {
        let Some(resolved) = validation.resolved_inputs.get(&job.name) else {
            return Ok(None);
        };
        match resolved {
            ResolvedInput::Job(name) => Ok(results_by_job.get(name).cloned()),
            ResolvedInput::EngineOf(engine_name) => {
                Ok(results_by_engine.get(&engine_name.to_lowercase()).cloned())
            }
            ResolvedInput::ExternalPath(reference) => {
                if !self.registry.has_any_loader() {
                    return Err(CoreError::ExternalInputUnsupported(job.name.clone()));
                }
                // No loader name is specified in the job schema beyond the
                // bare reference; the first registered loader is tried.
                let names = self.registry.list(Some("loader"));
                let loader_name = names
                    .get("loader")
                    .and_then(|v| v.first())
                    .ok_or_else(|| CoreError::ExternalInputUnsupported(job.name.clone()))?;
                let loader = self
                    .registry
                    .create_loader(loader_name, &serde_yaml::Value::Null)?;
                Ok(Some(loader.load(reference)?))
            }
        }
    }

    fn merge_system_override(&self, job: &JobConfig) -> SystemConfig {
        let Some(over) = &job.system_override else {
            return self.system.clone();
        };
        let base = serde_yaml::to_value(&self.system).unwrap_or(serde_yaml::Value::Null);
        let patch = serde_yaml::to_value(over).unwrap_or(serde_yaml::Value::Null);
        let merged = simrun_common::deep_merge(&base, &patch);
        serde_yaml::from_value(merged).unwrap_or_else(|_| self.system.clone())
    }

    /// Build the job's plugin set. Per `spec.md` §4.6 step 3, the dict
    /// handed to each plugin constructor is layered: system defaults (there
    /// is no separate system-wide plugin-params field, so this layer is
    /// empty) → global plugin configuration loaded from
    /// `system.paths.global_file` → this job's own `plugins` entry, which
    /// wins.
    fn build_plugins(&self, job: &JobConfig, system: &SystemConfig) -> CoreResult<PluginSet> {
        let global = load_global_plugin_config(&system.paths.global_file);
        let mut set = PluginSet::new();
        for (kind, named) in &job.plugins {
            for (name, params) in named {
                let full_name = format!("{kind}:{name}");
                let defaults = plugin_global_defaults(&global, kind, name);
                let effective_params = simrun_common::deep_merge(&defaults, params);
                let plugin = self
                    .registry
                    .create(&full_name, &effective_params)
                    .map_err(|e| CoreError::PluginBuildFailed {
                        job: job.name.clone(),
                        kind: kind.clone(),
                        name: name.clone(),
                        detail: e.to_string(),
                    })?;
                set.insert(kind.clone(), plugin.clone());
                set.insert(format!("{kind}.{name}"), plugin);
            }
        }
        Ok(set)
    }
}

/// Read and parse the global plugin configuration file, shaped like
/// `job.plugins` (`plugin_kind -> plugin_name -> params`). Missing or
/// unparsable files degrade to an empty layer rather than failing the run —
/// the file is optional system-wide scaffolding, not a per-job requirement.
fn load_global_plugin_config(path: &str) -> serde_yaml::Value {
    match std::fs::read_to_string(path) {
        Ok(body) => serde_yaml::from_str(&body).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "failed to parse global plugin configuration, ignoring");
            serde_yaml::Value::Null
        }),
        Err(_) => serde_yaml::Value::Null,
    }
}

fn plugin_global_defaults(global: &serde_yaml::Value, kind: &str, name: &str) -> serde_yaml::Value {
    let serde_yaml::Value::Mapping(top) = global else {
        return serde_yaml::Value::Null;
    };
    let Some(serde_yaml::Value::Mapping(by_kind)) =
        top.get(&serde_yaml::Value::String(kind.to_string()))
    else {
        return serde_yaml::Value::Null;
    };
    by_kind
        .get(&serde_yaml::Value::String(name.to_string()))
        .cloned()
        .unwrap_or(serde_yaml::Value::Null)
}

fn allocate_run_dir(system: &SystemConfig, job: &JobConfig) -> CoreResult<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S");
    let short_uuid = Uuid::new_v4().to_string();
    let short_uuid = &short_uuid[..8];
    let root = Path::new(&system.paths.output_dir);
    Ok(root.join(format!("{timestamp}_{short_uuid}_{}", job.output_label())))
}

/// Wrap a progress sink so a panic inside it is caught and logged instead of
/// unwinding into the engine's own call stack (`spec.md` §9).
fn guarded_progress_cb<'a>(
    inner: &'a mut dyn FnMut(ProgressUpdate),
) -> impl FnMut(ProgressUpdate) + 'a {
    move |update: ProgressUpdate| {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| inner(update)));
        if outcome.is_err() {
            warn!("progress callback panicked; job execution continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{Plugin, PluginFactory, ResultObject};
    use crate::validator;
    use std::any::Any;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Debug)]
    struct StubResult;
    impl ResultObject for StubResult {
        fn data(&self) -> &dyn Any {
            self
        }
        fn metadata(&self) -> &serde_yaml::Value {
            static NULL: serde_yaml::Value = serde_yaml::Value::Null;
            &NULL
        }
        fn save(&self, path: &Path) -> CoreResult<PathBuf> {
            Ok(path.join("result.bin"))
        }
    }

    #[derive(Debug)]
    struct StubEngine {
        reports_progress: bool,
    }
    impl Engine for StubEngine {
        fn run(
            &mut self,
            _input: Option<Arc<dyn ResultObject>>,
            progress: Option<&mut dyn FnMut(ProgressUpdate)>,
        ) -> CoreResult<Box<dyn ResultObject>> {
            if let Some(cb) = progress {
                cb(ProgressUpdate {
                    percent: Some(1.0),
                    total_duration_estimate_seconds: None,
                    message: "done".into(),
                    stage: None,
                });
            }
            Ok(Box::new(StubResult))
        }
        fn accepts_progress(&self) -> bool {
            self.reports_progress
        }
    }

    fn dummy_plugin_factory() -> PluginFactory {
        #[derive(Debug)]
        struct P;
        impl Plugin for P {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
        Arc::new(|_params| Ok(Box::new(P) as Box<dyn Plugin>))
    }

    fn system_with_dir(dir: &Path) -> SystemConfig {
        let mut system = SystemConfig::default();
        system.paths.output_dir = dir.display().to_string();
        system.paths.global_file = "global.yaml".into();
        system
    }

    #[test]
    fn build_plugins_layers_global_file_under_job_params() {
        let dir = tempfile::tempdir().unwrap();
        let global_path = dir.path().join("global.yaml");
        std::fs::write(
            &global_path,
            "model:\n  dummy:\n    a: from_global\n    b: from_global\n",
        )
        .unwrap();

        let captured: Arc<std::sync::Mutex<Option<serde_yaml::Value>>> =
            Arc::new(std::sync::Mutex::new(None));
        let sink = captured.clone();
        let mut registry = Registry::new();
        registry
            .register(
                "model",
                "dummy",
                Arc::new(move |params: &serde_yaml::Value| {
                    *sink.lock().unwrap() = Some(params.clone());
                    #[derive(Debug)]
                    struct P;
                    impl Plugin for P {
                        fn as_any(&self) -> &dyn Any {
                            self
                        }
                    }
                    Ok(Box::new(P) as Box<dyn Plugin>)
                }),
                false,
                false,
            )
            .unwrap();

        let job: JobConfig = serde_yaml::from_str(
            "name: j1\nengine:\n  sde: {}\nplugins:\n  model:\n    dummy:\n      b: from_job\n",
        )
        .unwrap();

        let mut system = system_with_dir(dir.path());
        system.paths.global_file = global_path.display().to_string();
        let scheduler = Scheduler::new(registry, system.clone());

        let _set = scheduler.build_plugins(&job, &system).unwrap();
        let params = captured.lock().unwrap().clone().unwrap();
        assert_eq!(params["a"].as_str(), Some("from_global"));
        assert_eq!(params["b"].as_str(), Some("from_job"));
    }

    #[test]
    fn single_job_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        registry
            .register_engine(
                "sde",
                Arc::new(|_params, _plugins| {
                    Ok(Box::new(StubEngine {
                        reports_progress: true,
                    }) as Box<dyn Engine>)
                }),
                false,
            )
            .unwrap();
        registry
            .register("model", "dummy", dummy_plugin_factory(), false, false)
            .unwrap();

        let job: JobConfig = serde_yaml::from_str(
            "name: j1\nengine:\n  sde: {}\nplugins:\n  model:\n    dummy: {}",
        )
        .unwrap();
        let jobs = vec![job];
        let validation = validator::validate(&jobs).unwrap();

        let scheduler = Scheduler::new(registry, system_with_dir(dir.path()));
        let opts = RunOptions {
            dry_run: false,
            resume: false,
            manifest_path: dir.path().join("manifest.json"),
            fail_fast: false,
        };
        let mut events = Vec::new();
        let outcomes = scheduler
            .run(&jobs, &validation, opts, |e| events.push(e))
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
    }

    #[test]
    fn dry_run_plans_without_executing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        let job: JobConfig = serde_yaml::from_str("name: j1\nengine:\n  sde: {}").unwrap();
        let jobs = vec![job];
        let validation = validator::validate(&jobs).unwrap();
        let scheduler = Scheduler::new(registry, system_with_dir(dir.path()));
        let opts = RunOptions {
            dry_run: true,
            resume: false,
            manifest_path: dir.path().join("manifest.json"),
            fail_fast: false,
        };
        let mut planned = 0;
        let outcomes = scheduler
            .run(&jobs, &validation, opts, |e| {
                if matches!(e, SchedulerEvent::DryRunPlanned { .. }) {
                    planned += 1;
                }
            })
            .unwrap();
        assert_eq!(planned, 1);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].run_id, "dry_run");
        assert!(outcomes[0].run_dir.join("snapshot.yaml").exists());
    }

    #[test]
    fn engine_without_progress_support_runs_without_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        registry
            .register_engine(
                "sde",
                Arc::new(|_params, _plugins| {
                    Ok(Box::new(StubEngine {
                        reports_progress: false,
                    }) as Box<dyn Engine>)
                }),
                false,
            )
            .unwrap();
        let job: JobConfig = serde_yaml::from_str("name: j1\nengine:\n  sde: {}").unwrap();
        let jobs = vec![job];
        let validation = validator::validate(&jobs).unwrap();
        let scheduler = Scheduler::new(registry, system_with_dir(dir.path()));
        let opts = RunOptions {
            dry_run: false,
            resume: false,
            manifest_path: dir.path().join("manifest.json"),
            fail_fast: false,
        };
        let outcomes = scheduler.run(&jobs, &validation, opts, |_| {}).unwrap();
        assert!(outcomes[0].success);
    }

    #[test]
    fn resume_skips_already_succeeded_job() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        let mut manifest =
            SessionManifest::new("s1".into(), "2026-01-01T00:00:00Z".into(), ["j1".into()]);
        manifest.mark("j1", JobStatus::Succeeded, None, None);
        manifest.save(&manifest_path).unwrap();

        let registry = Registry::new();
        let job: JobConfig = serde_yaml::from_str("name: j1\nengine:\n  sde: {}").unwrap();
        let jobs = vec![job];
        let validation = validator::validate(&jobs).unwrap();
        let scheduler = Scheduler::new(registry, system_with_dir(dir.path()));
        let opts = RunOptions {
            dry_run: false,
            resume: true,
            manifest_path,
            fail_fast: false,
        };
        let mut skipped = 0;
        let outcomes = scheduler
            .run(&jobs, &validation, opts, |e| {
                if matches!(e, SchedulerEvent::JobSkippedResumed { .. }) {
                    skipped += 1;
                }
            })
            .unwrap();
        assert_eq!(skipped, 1);
        assert!(outcomes.is_empty());
    }
}

//! Two distinct manifests named in `spec.md` §6:
//!
//! - a small **run manifest** (`<run_dir>/manifest.json`) identifying one
//!   job's run: `{run_id, job_index, job_name}`.
//! - the **session manifest** (`session_manifest.json` at the session
//!   root), which is what `--resume` reads: `{session_id, start_time,
//!   status, jobs: {name -> {status, run_id, output_dir}}}`.
//!
//! Both are written atomically (temp file + rename) so a crash mid-write
//! never leaves a corrupt manifest behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionJobEntry {
    pub status: JobStatus,
    pub run_id: Option<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionManifest {
    pub session_id: String,
    pub start_time: String,
    pub status: SessionStatus,
    pub jobs: BTreeMap<String, SessionJobEntry>,
}

impl SessionManifest {
    pub fn new(
        session_id: String,
        start_time: String,
        job_names: impl IntoIterator<Item = String>,
    ) -> Self {
        SessionManifest {
            session_id,
            start_time,
            status: SessionStatus::Running,
            jobs: job_names
                .into_iter()
                .map(|name| {
                    (
                        name,
                        SessionJobEntry {
                            status: JobStatus::Pending,
                            run_id: None,
                            output_dir: None,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn mark(
        &mut self,
        job_name: &str,
        status: JobStatus,
        output_dir: Option<PathBuf>,
        run_id: Option<String>,
    ) {
        let entry = self.jobs.entry(job_name.to_string()).or_insert(SessionJobEntry {
            status: JobStatus::Pending,
            run_id: None,
            output_dir: None,
        });
        entry.status = status;
        if output_dir.is_some() {
            entry.output_dir = output_dir;
        }
        if run_id.is_some() {
            entry.run_id = run_id;
        }
    }

    pub fn finish(&mut self, any_failed: bool) {
        self.status = if any_failed {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
    }

    /// Jobs resumption should skip: already `Succeeded`. `Failed` and
    /// `Running` (interrupted mid-flight) jobs are re-attempted.
    pub fn is_done(&self, job_name: &str) -> bool {
        self.jobs
            .get(job_name)
            .map(|e| e.status == JobStatus::Succeeded)
            .unwrap_or(false)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let body = fs::read_to_string(path).map_err(|e| CoreError::RuntimeIoError {
            job: "<session>".into(),
            detail: format!("reading {}: {e}", path.display()),
        })?;
        serde_json::from_str(&body).map_err(|e| {
            CoreError::ConfigParse(format!("parsing session manifest {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        atomic_write_json(path, self, "<session>")
    }
}

/// The small per-run manifest written alongside `snapshot.yaml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub job_index: usize,
    pub job_name: String,
}

impl RunManifest {
    pub fn write(run_dir: &Path, run_id: &str, job_index: usize, job_name: &str) -> CoreResult<()> {
        let manifest = RunManifest {
            run_id: run_id.to_string(),
            job_index,
            job_name: job_name.to_string(),
        };
        atomic_write_json(&run_dir.join("manifest.json"), &manifest, job_name)
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T, job: &str) -> CoreResult<()> {
    let body = serde_json::to_string_pretty(value).map_err(|e| CoreError::RuntimeIoError {
        job: job.to_string(),
        detail: format!("serializing {}: {e}", path.display()),
    })?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, body).map_err(|e| CoreError::RuntimeIoError {
        job: job.to_string(),
        detail: format!("writing {}: {e}", tmp_path.display()),
    })?;
    fs::rename(&tmp_path, path).map_err(|e| CoreError::RuntimeIoError {
        job: job.to_string(),
        detail: format!("renaming {} to {}: {e}", tmp_path.display(), path.display()),
    })?;
    debug!(path = %path.display(), "wrote manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_manifest.json");
        let mut manifest =
            SessionManifest::new("sess1".into(), "2026-01-01T00:00:00Z".into(), ["a".into(), "b".into()]);
        manifest.mark(
            "a",
            JobStatus::Succeeded,
            Some(PathBuf::from("/tmp/a")),
            Some("r1".into()),
        );
        manifest.save(&path).unwrap();

        let loaded = SessionManifest::load(&path).unwrap();
        assert!(loaded.is_done("a"));
        assert!(!loaded.is_done("b"));
    }

    #[test]
    fn failed_and_running_jobs_are_not_done() {
        let mut manifest =
            SessionManifest::new("sess1".into(), "2026-01-01T00:00:00Z".into(), ["a".into(), "b".into()]);
        manifest.mark("a", JobStatus::Failed, None, None);
        manifest.mark("b", JobStatus::Running, None, None);
        assert!(!manifest.is_done("a"));
        assert!(!manifest.is_done("b"));
    }

    #[test]
    fn run_manifest_writes_to_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        RunManifest::write(dir.path(), "run-1", 0, "job-a").unwrap();
        let body = fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        assert!(body.contains("run-1"));
        assert!(body.contains("job-a"));
    }
}

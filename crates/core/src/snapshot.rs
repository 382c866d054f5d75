//! Reproducibility snapshot: a `snapshot.yaml` written into every run
//! directory before the engine runs, capturing the effective configuration
//! and the plugin/engine names resolved for the job (`spec.md` §4.6 step 6).
//!
//! Best-effort: a failure to write the snapshot is logged and does not fail
//! the job, per the scheduler's step ordering in `spec.md` §4.6.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::schema::JobConfig;

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub run_id: &'a str,
    pub job: &'a JobConfig,
    pub engine_name: &'a str,
    pub plugin_names: Vec<String>,
    pub created_at: String,
}

/// Write `snapshot.yaml` under `run_dir`. Returns `Ok(())` even when nothing
/// was written, after logging a warning, so callers never need to branch on
/// whether the snapshot exists.
pub fn write_snapshot(run_dir: &Path, snapshot: &Snapshot<'_>) {
    let path = run_dir.join("snapshot.yaml");
    let body = match serde_yaml::to_string(snapshot) {
        Ok(body) => body,
        Err(e) => {
            warn!(run_id = snapshot.run_id, error = %e, "failed to serialize run snapshot");
            return;
        }
    };
    if let Err(e) = std::fs::write(&path, body) {
        warn!(
            run_id = snapshot.run_id,
            path = %path.display(),
            error = %e,
            "failed to write run snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let job: JobConfig = serde_yaml::from_str("name: j\nengine:\n  sde: {}").unwrap();
        let snapshot = Snapshot {
            run_id: "abc123",
            job: &job,
            engine_name: "sde",
            plugin_names: vec!["model.dummy".into()],
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        write_snapshot(dir.path(), &snapshot);
        let content = std::fs::read_to_string(dir.path().join("snapshot.yaml")).unwrap();
        assert!(content.contains("abc123"));
        assert!(content.contains("sde"));
    }
}

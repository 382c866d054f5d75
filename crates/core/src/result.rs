//! The scheduler's own bookkeeping record for a completed (or failed) job,
//! as distinct from `plugins::ResultObject` (the engine's computed payload).

use std::path::PathBuf;

use serde::Serialize;

/// One line of the run's outcome ledger (`spec.md` §3/§6), serialized into
/// the session manifest and printed by the CLI's summary table.
#[derive(Clone, Debug, Serialize)]
pub struct JobResult {
    pub job_index: usize,
    pub job_name: String,
    pub run_dir: PathBuf,
    pub run_id: String,
    pub success: bool,
    pub error: Option<String>,
}

impl JobResult {
    pub fn ok(job_index: usize, job_name: String, run_dir: PathBuf, run_id: String) -> Self {
        JobResult {
            job_index,
            job_name,
            run_dir,
            run_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(
        job_index: usize,
        job_name: String,
        run_dir: PathBuf,
        run_id: String,
        error: String,
    ) -> Self {
        JobResult {
            job_index,
            job_name,
            run_dir,
            run_id,
            success: false,
            error: Some(error),
        }
    }
}

//! Two-stage pre-execution validation: engine cardinality, then data-flow
//! reference resolution (`spec.md` §4.5). Runs once, after expansion, over
//! the whole job list; any failure aborts before any job runs.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::{CoreError, CoreResult};
use crate::schema::JobConfig;

/// What a job's `input` field resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedInput {
    /// Names a sibling job directly.
    Job(String),
    /// Names an engine used by exactly one earlier job.
    EngineOf(String),
    /// Didn't match any job or engine name; treated as an external file
    /// reference. Not verified at this stage (`spec.md` §4.5).
    ExternalPath(String),
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Resolution of every job that declared an `input`, keyed by job name.
    pub resolved_inputs: HashMap<String, ResolvedInput>,
}

/// Validate an already-expanded job list. Stage A (engine cardinality) is
/// also enforced per-job by `JobConfig::validate`, but is re-checked here
/// across the whole list alongside uniqueness of job names (Open Question 2
/// in `spec.md` §9: duplicate names are `schema-invalid`).
pub fn validate(jobs: &[JobConfig]) -> CoreResult<ValidationReport> {
    let mut seen_names = HashSet::new();
    for job in jobs {
        job.validate()?;
        if !seen_names.insert(job.name.clone()) {
            return Err(CoreError::DuplicateJobName(job.name.clone()));
        }
    }

    let mut report = ValidationReport::default();
    for (idx, job) in jobs.iter().enumerate() {
        let Some(input) = &job.input else {
            continue;
        };

        // A sibling job name takes priority over an engine-name match.
        if jobs.iter().any(|j| &j.name == input) {
            trace!(job = %job.name, input, "input resolves to sibling job");
            report
                .resolved_inputs
                .insert(job.name.clone(), ResolvedInput::Job(input.clone()));
            continue;
        }

        let earlier_with_engine: Vec<&JobConfig> = jobs[..idx]
            .iter()
            .filter(|j| {
                let (engine_name, _) = j.engine_entry();
                engine_name.eq_ignore_ascii_case(input)
            })
            .collect();

        match earlier_with_engine.len() {
            0 => {
                trace!(job = %job.name, input, "input treated as external path");
                report.resolved_inputs.insert(
                    job.name.clone(),
                    ResolvedInput::ExternalPath(input.clone()),
                );
            }
            1 => {
                report
                    .resolved_inputs
                    .insert(job.name.clone(), ResolvedInput::EngineOf(input.clone()));
            }
            n => {
                return Err(CoreError::AmbiguousInput {
                    job: job.name.clone(),
                    input: input.clone(),
                    count: n,
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(yaml: &str) -> JobConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn sibling_job_name_resolves_directly() {
        let jobs = vec![
            job("name: a\nengine:\n  sde: {}"),
            job("name: b\nengine:\n  sde: {}\ninput: a"),
        ];
        let report = validate(&jobs).unwrap();
        assert_eq!(
            report.resolved_inputs.get("b"),
            Some(&ResolvedInput::Job("a".into()))
        );
    }

    #[test]
    fn unambiguous_engine_name_resolves() {
        let jobs = vec![
            job("name: a\nengine:\n  sde: {}"),
            job("name: c\nengine:\n  ode: {}\ninput: sde"),
        ];
        let report = validate(&jobs).unwrap();
        assert_eq!(
            report.resolved_inputs.get("c"),
            Some(&ResolvedInput::EngineOf("sde".into()))
        );
    }

    #[test]
    fn ambiguous_engine_name_fails_s3() {
        let jobs = vec![
            job("name: a\nengine:\n  sde: {}"),
            job("name: b\nengine:\n  sde: {}"),
            job("name: c\nengine:\n  ode: {}\ninput: sde"),
        ];
        let err = validate(&jobs).unwrap_err();
        assert!(matches!(err, CoreError::AmbiguousInput { count: 2, .. }));
    }

    #[test]
    fn single_engine_user_is_not_ambiguous() {
        let jobs = vec![
            job("name: a\nengine:\n  sde: {}"),
            job("name: c\nengine:\n  ode: {}\ninput: sde"),
            job("name: d\nengine:\n  ode: {}"),
        ];
        assert!(validate(&jobs).is_ok());
    }

    #[test]
    fn unmatched_input_is_external_path() {
        let jobs = vec![job("name: a\nengine:\n  sde: {}\ninput: /data/foo.csv")];
        let report = validate(&jobs).unwrap();
        assert_eq!(
            report.resolved_inputs.get("a"),
            Some(&ResolvedInput::ExternalPath("/data/foo.csv".into()))
        );
    }

    #[test]
    fn duplicate_job_names_rejected() {
        let jobs = vec![
            job("name: a\nengine:\n  sde: {}"),
            job("name: a\nengine:\n  ode: {}"),
        ];
        let err = validate(&jobs).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateJobName(_)));
    }

    #[test]
    fn missing_engine_caught_at_validation() {
        let jobs = vec![job("name: a\nengine: {}")];
        let err = validate(&jobs).unwrap_err();
        assert!(matches!(err, CoreError::MissingEngine(_)));
    }
}

//! Error taxonomy for the job orchestrator core.
//!
//! One variant per error kind named in the specification. Each variant
//! carries a stable numeric code (`code()`) and a human-readable message
//! (`Display`, via `thiserror`), grouped by the stage of the pipeline that
//! raises it: 1xxx configuration, 2xxx registry, 3xxx expansion/validation,
//! 4xxx scheduler/runtime.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("[1001] could not parse configuration: {0}")]
    ConfigParse(String),

    #[error("[1002] no YAML parser available at runtime")]
    ConfigNoParser,

    #[error("[1003] configuration failed validation: {0}")]
    SchemaInvalid(String),

    #[error("[1004] job '{name}' not found; searched {searched:?}; known jobs: {known:?}")]
    JobNotFound {
        name: String,
        searched: Vec<PathBuf>,
        known: Vec<String>,
    },

    #[error("[2001] duplicate registration for '{namespace}:{name}'")]
    DuplicateRegistration { namespace: String, name: String },

    #[error("[2002] unknown registry key '{namespace}:{name}'")]
    UnknownKey { namespace: String, name: String },

    #[error("[2003] unresolvable target for '{namespace}:{name}' ({kind}): {detail}")]
    UnresolvableTarget {
        namespace: String,
        name: String,
        kind: UnresolvableKind,
        detail: String,
    },

    #[error("[3001] job '{0}' has no engine entry")]
    MissingEngine(String),

    #[error("[3002] job '{job}' has {count} engine entries; exactly one is required")]
    AmbiguousEngine { job: String, count: usize },

    #[error("[3003] input '{input}' on job '{job}' resolves to {count} upstream jobs sharing engine name '{input}'")]
    AmbiguousInput {
        job: String,
        input: String,
        count: usize,
    },

    #[error("[3004] job '{0}' references external input but no loader plugin is registered")]
    ExternalInputUnsupported(String),

    #[error("[3005] zipped sweep expansion for job '{job}' has mismatched axis lengths: {lengths:?}")]
    SweepLengthMismatch { job: String, lengths: Vec<usize> },

    #[error("[3006] duplicate job name '{0}' within a job list")]
    DuplicateJobName(String),

    #[error("[4001] failed to build plugin '{kind}:{name}' for job '{job}': {detail}")]
    PluginBuildFailed {
        job: String,
        kind: String,
        name: String,
        detail: String,
    },

    #[error("[4002] failed to initialize engine '{name}' for job '{job}': {detail}")]
    EngineInitFailed {
        job: String,
        name: String,
        detail: String,
    },

    #[error("[4003] plugin '{kind}:{name}' configuration is invalid: {detail}")]
    PluginConfigInvalid {
        kind: String,
        name: String,
        detail: String,
    },

    #[error("[4004] engine for job '{0}' returned a value that does not satisfy the result contract")]
    ResultContractViolation(String),

    #[error("[4005] I/O error while running job '{job}': {detail}")]
    RuntimeIoError { job: String, detail: String },

    #[error("[4006] engine for job '{job}' failed during execution: {detail}")]
    RuntimeEngineError { job: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvableKind {
    Backend,
    Visualizer,
    Generic,
}

impl std::fmt::Display for UnresolvableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnresolvableKind::Backend => "backend",
            UnresolvableKind::Visualizer => "visualizer",
            UnresolvableKind::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

impl CoreError {
    /// Stable numeric code for this error kind, parsed out of the message
    /// prefix so there is exactly one place the mapping can drift.
    pub fn code(&self) -> u32 {
        let msg = self.to_string();
        let inside = msg
            .strip_prefix('[')
            .and_then(|s| s.split(']').next())
            .unwrap_or("0");
        inside.parse().unwrap_or(0)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

//! Typed configuration records: `JobConfig`, `JobList`, `SystemConfig`, and
//! the small value types they're built from.
//!
//! Represented as a typed tree rather than opaque generic maps, per the
//! Design Note in `spec.md` §9 — known shapes are concrete structs; unknown,
//! pass-through fields stay as `serde_yaml::Value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One declared unit of work, as parsed straight out of a job YAML file
/// (`spec.md` §6). Unknown top-level keys are rejected by `deny_unknown_fields`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub name: String,
    pub engine: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub plugins: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
    #[serde(default)]
    pub params: serde_yaml::Value,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, rename = "system")]
    pub system_override: Option<SystemConfig>,
    #[serde(default)]
    pub combinator: Option<ScanMethod>,
}

impl JobConfig {
    /// Engine cardinality, schema shape, and path non-emptiness checks that
    /// don't depend on any other job in the list (`spec.md` §4.3).
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::SchemaInvalid(
                "job name must not be empty".into(),
            ));
        }
        match self.engine.len() {
            1 => Ok(()),
            0 => Err(CoreError::MissingEngine(self.name.clone())),
            n => Err(CoreError::AmbiguousEngine {
                job: self.name.clone(),
                count: n,
            }),
        }?;
        if let Some(sys) = &self.system_override {
            sys.validate()?;
        }
        Ok(())
    }

    /// The job's single engine name, case-folded, and its parameter tree.
    /// Panics only if called before `validate()` succeeded — every caller
    /// in this crate validates first.
    pub fn engine_entry(&self) -> (&str, &serde_yaml::Value) {
        let (name, params) = self
            .engine
            .iter()
            .next()
            .expect("engine_entry called on a job without exactly one engine");
        (name.as_str(), params)
    }

    /// Output label, defaulting to the job's own name (`spec.md` §3).
    pub fn output_label(&self) -> &str {
        self.output.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered sequence of jobs; execution order follows list order except
/// where data-flow dependencies force otherwise (`spec.md` §3).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct JobList(pub Vec<JobConfig>);

impl JobList {
    pub fn new(jobs: Vec<JobConfig>) -> Self {
        JobList(jobs)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for JobList {
    type Item = JobConfig;
    type IntoIter = std::vec::IntoIter<JobConfig>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// `parameter_scan.method`: Cartesian product vs. zipped alignment
/// (`spec.md` §4.4).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    #[default]
    Cartesian,
    Zipped,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ParameterScan {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: ScanMethod,
    #[serde(default)]
    pub numbered_outputs: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SystemPaths {
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub global_file: String,
    #[serde(default)]
    pub plugin_dirs: Vec<String>,
    #[serde(default)]
    pub config_dirs: Vec<String>,
}

/// Process-wide configuration (`spec.md` §3). Every field defaults so that
/// `SystemConfig::default()` is a usable, if inert, starting point before
/// any layer is merged in.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub paths: SystemPaths,
    #[serde(default)]
    pub auto_save_results: bool,
    #[serde(default)]
    pub parameter_scan: ParameterScan,
    #[serde(default = "default_progress_interval")]
    pub progress_update_interval: f64,
}

fn default_progress_interval() -> f64 {
    1.0
}

impl SystemConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.progress_update_interval < 0.0 {
            return Err(CoreError::SchemaInvalid(
                "progress_update_interval must be >= 0".into(),
            ));
        }
        for (field, value) in [
            ("output_dir", &self.paths.output_dir),
            ("global_file", &self.paths.global_file),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::SchemaInvalid(format!(
                    "paths.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// A validated record whose schema is supplied by the owning plugin; the
/// core only checks that it deserializes and carries the raw tree forward
/// for the plugin's own (pluggable) validation step (`spec.md` §4.3).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_engine_is_rejected() {
        let job: JobConfig = serde_yaml::from_str("name: j\nengine: {}").unwrap();
        assert!(matches!(
            job.validate(),
            Err(CoreError::MissingEngine(_))
        ));
    }

    #[test]
    fn ambiguous_engine_is_rejected() {
        let job: JobConfig =
            serde_yaml::from_str("name: j\nengine:\n  sde: {}\n  ode: {}").unwrap();
        assert!(matches!(
            job.validate(),
            Err(CoreError::AmbiguousEngine { count: 2, .. })
        ));
    }

    #[test]
    fn unknown_top_level_key_rejected_at_parse_time() {
        let err = serde_yaml::from_str::<JobConfig>("name: j\nengine:\n  sde: {}\nbogus: 1")
            .unwrap_err();
        assert!(err.to_string().contains("bogus") || err.to_string().contains("unknown field"));
    }

    #[test]
    fn output_label_defaults_to_name() {
        let job: JobConfig = serde_yaml::from_str("name: j\nengine:\n  sde: {}").unwrap();
        assert_eq!(job.output_label(), "j");
    }
}

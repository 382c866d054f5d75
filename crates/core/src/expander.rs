//! Parameter-sweep expansion: turn list-valued configuration leaves into
//! multiple scalar-valued jobs (`spec.md` §4.4).
//!
//! Detection walks the whole job tree (`engine`, `plugins.*`, `params`)
//! rather than requiring a registered plugin schema up front, since
//! expansion must run before any plugin is instantiated. This is a
//! documented simplification of the source system's per-field `scanable`
//! hint — see DESIGN.md.

use serde_yaml::Value;

use crate::error::{CoreError, CoreResult};
use crate::schema::{JobConfig, ScanMethod};

/// One sweep axis: the dotted key path it was found at (used both for
/// deterministic ordering and for writing the chosen value back) and the
/// list of values it ranges over.
#[derive(Clone, Debug)]
struct Axis {
    path: Vec<String>,
    values: Vec<Value>,
}

impl Axis {
    fn flattened_key(&self) -> String {
        self.path.join(".")
    }
}

const ROOTS: &[&str] = &["engine", "plugins", "params"];

/// Expand one job into one or more scalar-valued jobs. `method` and
/// `numbered_outputs` come from the effective `SystemConfig` (or the job's
/// own `combinator` override).
pub fn expand_job(
    job: &JobConfig,
    method: ScanMethod,
    numbered_outputs: bool,
) -> CoreResult<Vec<JobConfig>> {
    let whole = serde_yaml::to_value(job)
        .map_err(|e| CoreError::ConfigParse(format!("re-serializing job '{}': {e}", job.name)))?;

    let mut axes = Vec::new();
    if let Value::Mapping(map) = &whole {
        for root in ROOTS {
            if let Some(sub) = map.get(&Value::String(root.to_string())) {
                collect_axes(sub, vec![root.to_string()], &mut axes);
            }
        }
    }
    axes.sort_by(|a, b| a.flattened_key().cmp(&b.flattened_key()));

    if axes.is_empty() {
        return Ok(vec![job.clone()]);
    }

    let combos = match method {
        ScanMethod::Cartesian => cartesian_combos(&axes),
        ScanMethod::Zipped => zipped_combos(job, &axes)?,
    };

    let total = combos.len();
    let mut out = Vec::with_capacity(total);
    for (idx, combo) in combos.into_iter().enumerate() {
        let mut tree = whole.clone();
        for (axis, value) in axes.iter().zip(combo.iter()) {
            set_path(&mut tree, &axis.path, value.clone());
        }
        let mut expanded: JobConfig = serde_yaml::from_value(tree).map_err(|e| {
            CoreError::ConfigParse(format!("rebuilding expanded job '{}': {e}", job.name))
        })?;
        if numbered_outputs && total > 1 {
            let suffix = format!("_{:03}", idx + 1);
            expanded.name = format!("{}{suffix}", job.name);
            expanded.output = Some(format!("{}{suffix}", job.output_label()));
        }
        out.push(expanded);
    }
    Ok(out)
}

/// Expand an entire job list, preserving order. When `enabled` is `false`,
/// every job passes through unchanged regardless of any list-valued leaves
/// it carries — `spec.md` §8 invariant 1 (`expand(L) == L` whenever
/// `parameter_scan.enabled == false`).
pub fn expand_job_list(
    jobs: &[JobConfig],
    enabled: bool,
    default_method: ScanMethod,
    numbered_outputs: bool,
) -> CoreResult<Vec<JobConfig>> {
    if !enabled {
        return Ok(jobs.to_vec());
    }
    let mut out = Vec::new();
    for job in jobs {
        let method = job.combinator.unwrap_or(default_method);
        out.extend(expand_job(job, method, numbered_outputs)?);
    }
    Ok(out)
}

fn collect_axes(value: &Value, path: Vec<String>, axes: &mut Vec<Axis>) {
    match value {
        Value::Sequence(seq) if !seq.is_empty() => {
            axes.push(Axis {
                path,
                values: seq.clone(),
            });
        }
        Value::Mapping(map) => {
            for (k, v) in map.iter() {
                if let Value::String(key) = k {
                    let mut next = path.clone();
                    next.push(key.clone());
                    collect_axes(v, next, axes);
                }
            }
        }
        _ => {}
    }
}

fn set_path(root: &mut Value, path: &[String], new_value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = new_value;
        return;
    };
    if let Value::Mapping(map) = root {
        let key = Value::String(head.clone());
        if let Some(existing) = map.get_mut(&key) {
            set_path(existing, rest, new_value);
        }
    }
}

fn cartesian_combos(axes: &[Axis]) -> Vec<Vec<Value>> {
    let mut combos: Vec<Vec<Value>> = vec![vec![]];
    for axis in axes {
        let mut next = Vec::with_capacity(combos.len() * axis.values.len());
        for combo in &combos {
            for v in &axis.values {
                let mut c = combo.clone();
                c.push(v.clone());
                next.push(c);
            }
        }
        combos = next;
    }
    combos
}

fn zipped_combos(job: &JobConfig, axes: &[Axis]) -> CoreResult<Vec<Vec<Value>>> {
    let lengths: Vec<usize> = axes.iter().map(|a| a.values.len()).collect();
    let common_len = lengths
        .iter()
        .copied()
        .filter(|&l| l != 1)
        .max()
        .unwrap_or(1);
    if lengths.iter().any(|&l| l != 1 && l != common_len) {
        return Err(CoreError::SweepLengthMismatch {
            job: job.name.clone(),
            lengths,
        });
    }
    let mut combos = Vec::with_capacity(common_len);
    for i in 0..common_len {
        let mut combo = Vec::with_capacity(axes.len());
        for axis in axes {
            let v = if axis.values.len() == 1 {
                axis.values[0].clone()
            } else {
                axis.values[i].clone()
            };
            combo.push(v);
        }
        combos.push(combo);
    }
    Ok(combos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JobConfig;
    use rstest::rstest;

    fn job(yaml: &str) -> JobConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[rstest]
    #[case::two_values(2)]
    #[case::three_values(3)]
    #[case::five_values(5)]
    fn zipped_expansion_produces_one_job_per_axis_value(#[case] len: usize) {
        let dts: Vec<String> = (0..len).map(|i| format!("{:.2}", 0.01 * (i + 1) as f64)).collect();
        let yaml = format!(
            "name: bar\nengine:\n  sde:\n    dt: [{}]",
            dts.join(", ")
        );
        let j = job(&yaml);
        let out = expand_job(&j, ScanMethod::Zipped, true).unwrap();
        assert_eq!(out.len(), len);
    }

    #[rstest]
    #[case::cartesian(ScanMethod::Cartesian, 4)]
    #[case::zipped(ScanMethod::Zipped, 2)]
    fn expansion_method_controls_combination_count(
        #[case] method: ScanMethod,
        #[case] expected: usize,
    ) {
        let j = job(
            "name: foo\nengine:\n  sde:\n    dt: [0.01, 0.02]\nplugins:\n  model:\n    dummy:\n      param: [1.0, 2.0]",
        );
        let out = expand_job(&j, method, false).unwrap();
        assert_eq!(out.len(), expected);
    }

    #[test]
    fn no_sweep_axes_returns_job_unchanged() {
        let j = job("name: foo\nengine:\n  sde:\n    dt: 0.01");
        let out = expand_job(&j, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "foo");
    }

    #[test]
    fn cartesian_expansion_s1() {
        let j = job(
            "name: foo\nengine:\n  sde:\n    dt: [0.01, 0.02]\nplugins:\n  model:\n    dummy:\n      param: [1.0, 2.0]",
        );
        let out = expand_job(&j, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out.len(), 4);
        let names: Vec<_> = out.iter().map(|j| j.name.clone()).collect();
        assert_eq!(
            names,
            vec!["foo_001", "foo_002", "foo_003", "foo_004"]
        );
        let pairs: Vec<(f64, f64)> = out
            .iter()
            .map(|j| {
                let dt = j.engine["sde"]["dt"].as_f64().unwrap();
                let param = j.plugins["model"]["dummy"]["param"].as_f64().unwrap();
                (dt, param)
            })
            .collect();
        assert_eq!(
            pairs,
            vec![(0.01, 1.0), (0.01, 2.0), (0.02, 1.0), (0.02, 2.0)]
        );
    }

    #[test]
    fn zipped_expansion_s2() {
        let j = job(
            "name: bar\nengine:\n  sde:\n    dt: [0.01, 0.02, 0.03]\nplugins:\n  model:\n    dummy:\n      param: [1.0, 2.0, 3.0]",
        );
        let out = expand_job(&j, ScanMethod::Zipped, true).unwrap();
        assert_eq!(out.len(), 3);
        let pairs: Vec<(f64, f64)> = out
            .iter()
            .map(|j| {
                let dt = j.engine["sde"]["dt"].as_f64().unwrap();
                let param = j.plugins["model"]["dummy"]["param"].as_f64().unwrap();
                (dt, param)
            })
            .collect();
        assert_eq!(pairs, vec![(0.01, 1.0), (0.02, 2.0), (0.03, 3.0)]);
    }

    #[test]
    fn zipped_length_mismatch_errors() {
        let j = job(
            "name: bar\nengine:\n  sde:\n    dt: [0.01, 0.02]\nplugins:\n  model:\n    dummy:\n      param: [1.0, 2.0, 3.0]",
        );
        let err = expand_job(&j, ScanMethod::Zipped, true).unwrap_err();
        assert!(matches!(err, CoreError::SweepLengthMismatch { .. }));
    }

    #[test]
    fn single_length_one_axis_keeps_original_name() {
        let j = job("name: foo\nengine:\n  sde:\n    dt: [0.01]");
        let out = expand_job(&j, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "foo");
    }

    #[test]
    fn zipped_single_axis_plus_scalars_is_one_job() {
        let j = job(
            "name: foo\nengine:\n  sde:\n    dt: [0.01]\nplugins:\n  model:\n    dummy:\n      param: [5.0]",
        );
        let out = expand_job(&j, ScanMethod::Zipped, true).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn disabled_scan_leaves_list_unexpanded_i1() {
        let jobs = vec![job(
            "name: foo\nengine:\n  sde:\n    dt: [0.01, 0.02]",
        )];
        let out = expand_job_list(&jobs, false, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "foo");
        assert_eq!(
            out[0].engine["sde"]["dt"],
            jobs[0].engine["sde"]["dt"]
        );
    }

    #[test]
    fn enabled_scan_expands_the_whole_list() {
        let jobs = vec![
            job("name: foo\nengine:\n  sde:\n    dt: [0.01, 0.02]"),
            job("name: bar\nengine:\n  sde:\n    dt: 0.05"),
        ];
        let out = expand_job_list(&jobs, true, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn numbering_is_skipped_for_a_single_produced_job() {
        let j = job("name: foo\nengine:\n  sde:\n    dt: 0.01");
        let out = expand_job(&j, ScanMethod::Cartesian, true).unwrap();
        assert_eq!(out[0].name, "foo");
    }
}

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};

use simrun_core::error::{CoreError, CoreResult};
use simrun_core::plugins::{Plugin, ResultObject};

use super::Visualizer;
use crate::result::TrajectoryResult;

/// Writes min/max/mean of each trajectory column to a text file. Downcasts
/// the result's `data()` to `TrajectoryResult`; any other result shape is a
/// result-contract violation from this visualizer's point of view.
#[derive(Debug, Default)]
pub struct SummaryVisualizer;

impl SummaryVisualizer {
    pub fn from_value(_params: &serde_yaml::Value) -> CoreResult<Self> {
        Ok(SummaryVisualizer)
    }
}

impl Plugin for SummaryVisualizer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Visualizer for SummaryVisualizer {
    fn render(&self, result: &dyn ResultObject, path: &Path) -> CoreResult<PathBuf> {
        let trajectory = result
            .data()
            .downcast_ref::<TrajectoryResult>()
            .ok_or_else(|| CoreError::ResultContractViolation("<visualizer>".into()))?;

        let mut body = String::new();
        for (col_idx, name) in trajectory.column_names.iter().enumerate() {
            let values: Vec<f64> = trajectory.states.iter().map(|row| row[col_idx]).collect();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            body.push_str(&format!("{name}: min={min} max={max} mean={mean}\n"));
        }

        let out_path = path.join("summary.txt");
        fs::write(&out_path, body).map_err(|e| CoreError::RuntimeIoError {
            job: "<visualizer>".into(),
            detail: format!("writing {}: {e}", out_path.display()),
        })?;
        Ok(out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_min_max_mean_per_column() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrajectoryResult::new(
            vec![0.0, 1.0, 2.0],
            vec![vec![1.0], vec![2.0], vec![3.0]],
            vec!["x".into()],
        );
        let viz = SummaryVisualizer;
        let path = viz.render(&result, dir.path()).unwrap();
        let body = fs::read_to_string(path).unwrap();
        assert!(body.contains("x: min=1 max=3 mean=2"));
    }
}

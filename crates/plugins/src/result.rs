//! The concrete `ResultObject` every reference engine in this crate returns:
//! a scalar time series, CSV-serializable, carrying whatever free-form
//! metadata the engine wants to travel with it.

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};

use simrun_core::error::{CoreError, CoreResult};
use simrun_core::plugins::ResultObject;

#[derive(Clone, Debug)]
pub struct TrajectoryResult {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub column_names: Vec<String>,
    pub metadata: serde_yaml::Value,
}

impl TrajectoryResult {
    pub fn new(times: Vec<f64>, states: Vec<Vec<f64>>, column_names: Vec<String>) -> Self {
        TrajectoryResult {
            times,
            states,
            column_names,
            metadata: serde_yaml::Value::Null,
        }
    }
}

impl ResultObject for TrajectoryResult {
    fn data(&self) -> &dyn Any {
        self
    }

    fn metadata(&self) -> &serde_yaml::Value {
        &self.metadata
    }

    fn save(&self, path: &Path) -> CoreResult<PathBuf> {
        let out_path = path.with_extension("csv");
        let csv_err = |e: csv::Error| CoreError::RuntimeIoError {
            job: "<result>".into(),
            detail: format!("writing {}: {e}", out_path.display()),
        };

        let mut writer = csv::Writer::from_path(&out_path).map_err(csv_err)?;
        let mut header = vec!["t".to_string()];
        header.extend(self.column_names.iter().cloned());
        writer.write_record(&header).map_err(csv_err)?;
        for (t, state) in self.times.iter().zip(self.states.iter()) {
            let mut record = vec![t.to_string()];
            record.extend(state.iter().map(|v| v.to_string()));
            writer.write_record(&record).map_err(csv_err)?;
        }
        writer
            .flush()
            .map_err(|e| CoreError::RuntimeIoError {
                job: "<result>".into(),
                detail: format!("writing {}: {e}", out_path.display()),
            })?;
        Ok(out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrajectoryResult::new(
            vec![0.0, 0.1],
            vec![vec![1.0, 0.0], vec![1.01, -0.02]],
            vec!["x".into(), "v".into()],
        );
        let path = result.save(&dir.path().join("run_one")).unwrap();
        assert_eq!(path.file_name().unwrap(), "run_one.csv");
        let body = fs::read_to_string(path).unwrap();
        assert!(body.starts_with("t,x,v\n"));
        assert_eq!(body.lines().count(), 3);
    }
}

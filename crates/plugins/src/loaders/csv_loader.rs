//! Reads a two-or-more-column `t,<value...>` CSV file from disk into a
//! [`TrajectoryResult`], mirroring the shape every engine in this crate
//! produces so an external trajectory can feed back in as a job's input.

use std::sync::Arc;

use simrun_core::error::{CoreError, CoreResult};
use simrun_core::plugins::{Loader, ResultObject};

use crate::result::TrajectoryResult;

#[derive(Debug, Default)]
pub struct CsvLoader;

impl CsvLoader {
    pub fn from_value(_params: &serde_yaml::Value) -> CoreResult<Self> {
        Ok(CsvLoader)
    }
}

impl Loader for CsvLoader {
    fn load(&self, reference: &str) -> CoreResult<Arc<dyn ResultObject>> {
        let io_err = |detail: String| CoreError::RuntimeIoError {
            job: "<loader>".into(),
            detail,
        };

        let mut reader = csv::Reader::from_path(reference)
            .map_err(|e| io_err(format!("reading {reference}: {e}")))?;
        let column_names: Vec<String> = reader
            .headers()
            .map_err(|e| io_err(format!("{reference}: reading header: {e}")))?
            .iter()
            .skip(1)
            .map(|s| s.to_string())
            .collect();

        let mut times = Vec::new();
        let mut states = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| io_err(format!("{reference}: {e}")))?;
            let mut fields = record.iter();
            let t: f64 = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| io_err(format!("{reference}: malformed time column")))?;
            let row: Vec<f64> = fields
                .map(|s| {
                    s.parse()
                        .map_err(|_| io_err(format!("{reference}: malformed data column")))
                })
                .collect::<CoreResult<_>>()?;
            times.push(t);
            states.push(row);
        }

        Ok(Arc::new(TrajectoryResult::new(times, states, column_names)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_trajectory_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "t,x,v").unwrap();
        writeln!(file, "0,1,0").unwrap();
        writeln!(file, "0.1,1.01,-0.02").unwrap();
        let loader = CsvLoader;
        let result = loader.load(file.path().to_str().unwrap()).unwrap();
        let trajectory = result.data().downcast_ref::<TrajectoryResult>().unwrap();
        assert_eq!(trajectory.column_names, vec!["x", "v"]);
        assert_eq!(trajectory.times.len(), 2);
    }
}

//! Engine entry point: steps a model's drift/diffusion pair forward with an
//! integrator for a fixed number of steps, emitting periodic progress and
//! returning the accumulated trajectory.

use std::sync::Arc;

use rand_distr::{Distribution, StandardNormal};
use serde::Deserialize;
use simrun_core::error::{CoreError, CoreResult};
use simrun_core::plugins::{Engine, Plugin, PluginSet, ProgressSink, ProgressUpdate, ResultObject};

use crate::integrators::{EulerMaruyama, Stepper};
use crate::models::{DriftDiffusionModel, VanDerPolModel};
use crate::result::TrajectoryResult;

#[derive(Clone, Debug, Deserialize)]
struct SdeEngineParams {
    #[serde(default)]
    t0: f64,
    #[serde(default = "default_dt")]
    dt: f64,
    #[serde(default = "default_n_steps")]
    n_steps: usize,
}

fn default_dt() -> f64 {
    0.01
}

fn default_n_steps() -> usize {
    1000
}

#[derive(Debug)]
pub struct SdeEngine {
    model: Arc<dyn Plugin>,
    integrator: Arc<dyn Plugin>,
    params: SdeEngineParams,
}

impl SdeEngine {
    pub fn build(params: &serde_yaml::Value, plugins: &PluginSet) -> CoreResult<Box<dyn Engine>> {
        let params: SdeEngineParams = serde_yaml::from_value(params.clone()).map_err(|e| {
            CoreError::EngineInitFailed {
                job: "<sde>".into(),
                name: "sde".into(),
                detail: e.to_string(),
            }
        })?;

        let model = plugins
            .get("model")
            .ok_or_else(|| CoreError::EngineInitFailed {
                job: "<sde>".into(),
                name: "sde".into(),
                detail: "no 'model' plugin supplied".into(),
            })?
            .clone();
        let integrator = plugins
            .get("integrator")
            .ok_or_else(|| CoreError::EngineInitFailed {
                job: "<sde>".into(),
                name: "sde".into(),
                detail: "no 'integrator' plugin supplied".into(),
            })?
            .clone();

        Ok(Box::new(SdeEngine {
            model,
            integrator,
            params,
        }))
    }

    fn model(&self) -> CoreResult<&VanDerPolModel> {
        self.model
            .as_any()
            .downcast_ref::<VanDerPolModel>()
            .ok_or_else(|| CoreError::EngineInitFailed {
                job: "<sde>".into(),
                name: "sde".into(),
                detail: "'model' plugin is not a van_der_pol model".into(),
            })
    }

    fn integrator(&self) -> CoreResult<&EulerMaruyama> {
        self.integrator
            .as_any()
            .downcast_ref::<EulerMaruyama>()
            .ok_or_else(|| CoreError::EngineInitFailed {
                job: "<sde>".into(),
                name: "sde".into(),
                detail: "'integrator' plugin is not euler_maruyama".into(),
            })
    }
}

impl Engine for SdeEngine {
    fn run(
        &mut self,
        _input: Option<Arc<dyn ResultObject>>,
        mut progress: Option<ProgressSink<'_>>,
    ) -> CoreResult<Box<dyn ResultObject>> {
        let model = self.model()?;
        let stepper = self.integrator()?;

        let mut rng = rand::thread_rng();
        let mut state = model.initial_state();
        let mut t = self.params.t0;
        let started = std::time::Instant::now();

        let mut times = Vec::with_capacity(self.params.n_steps + 1);
        let mut states = Vec::with_capacity(self.params.n_steps + 1);
        times.push(t);
        states.push(state.clone());

        for step in 0..self.params.n_steps {
            let drift = model.drift(t, &state);
            let diffusion = model.diffusion(t, &state);
            let noise: Vec<f64> = (0..model.dim())
                .map(|_| StandardNormal.sample(&mut rng))
                .collect();

            state = stepper.step(t, &state, self.params.dt, &drift, &diffusion, &noise);
            t += self.params.dt;
            times.push(t);
            states.push(state.clone());

            if let Some(sink) = progress.as_mut() {
                let percent = (step + 1) as f64 / self.params.n_steps as f64;
                let elapsed = started.elapsed().as_secs_f64();
                let total_duration_estimate_seconds =
                    if percent > 0.0 { Some(elapsed / percent) } else { None };
                sink(ProgressUpdate {
                    percent: Some(percent),
                    total_duration_estimate_seconds,
                    message: format!("step {}/{}", step + 1, self.params.n_steps),
                    stage: Some("integrating".into()),
                });
            }
        }

        Ok(Box::new(TrajectoryResult::new(
            times,
            states,
            model.state_names(),
        )))
    }

    fn accepts_progress(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn plugin_set() -> PluginSet {
        let mut set: PluginSet = PluginSet::new();
        let model = VanDerPolModel::from_value(&Value::Mapping(Default::default())).unwrap();
        let integrator = EulerMaruyama::from_value(&Value::Mapping(Default::default())).unwrap();
        set.insert("model".into(), Arc::new(model));
        set.insert("integrator".into(), Arc::new(integrator));
        set
    }

    #[test]
    fn runs_fixed_step_count_and_returns_trajectory() {
        let params: Value = serde_yaml::from_str("t0: 0.0\ndt: 0.01\nn_steps: 10").unwrap();
        let plugins = plugin_set();
        let mut engine = SdeEngine::build(&params, &plugins).unwrap();
        let result = engine.run(None, None).unwrap();
        let trajectory = result.data().downcast_ref::<TrajectoryResult>().unwrap();
        assert_eq!(trajectory.times.len(), 11);
        assert_eq!(trajectory.states.len(), 11);
    }

    #[test]
    fn progress_sink_is_invoked_once_per_step() {
        let params: Value = serde_yaml::from_str("n_steps: 5").unwrap();
        let plugins = plugin_set();
        let mut engine = SdeEngine::build(&params, &plugins).unwrap();
        let mut count = 0;
        let mut cb = |_u: ProgressUpdate| count += 1;
        engine.run(None, Some(&mut cb)).unwrap();
        assert_eq!(count, 5);
    }
}

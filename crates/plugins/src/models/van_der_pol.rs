//! Stochastic Van der Pol oscillator: the classical, real-valued relative
//! of the phase-space oscillator models in the source system's
//! `models/vdp_level2.py` — drift from the deterministic Van der Pol
//! equation, additive Gaussian noise on the velocity component.

use std::any::Any;

use serde::Deserialize;
use simrun_core::error::{CoreError, CoreResult};
use simrun_core::plugins::Plugin;

use super::DriftDiffusionModel;

#[derive(Clone, Debug, Deserialize)]
pub struct VanDerPolParams {
    #[serde(default = "default_mu")]
    pub mu: f64,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default)]
    pub x0: f64,
    #[serde(default)]
    pub v0: f64,
}

fn default_mu() -> f64 {
    1.0
}

fn default_sigma() -> f64 {
    0.1
}

#[derive(Debug)]
pub struct VanDerPolModel {
    params: VanDerPolParams,
}

impl VanDerPolModel {
    pub fn from_value(params: &serde_yaml::Value) -> CoreResult<Self> {
        let params: VanDerPolParams = serde_yaml::from_value(params.clone()).map_err(|e| {
            CoreError::PluginConfigInvalid {
                kind: "model".into(),
                name: "van_der_pol".into(),
                detail: e.to_string(),
            }
        })?;
        Ok(VanDerPolModel { params })
    }
}

impl Plugin for VanDerPolModel {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DriftDiffusionModel for VanDerPolModel {
    fn dim(&self) -> usize {
        2
    }

    fn initial_state(&self) -> Vec<f64> {
        vec![self.params.x0, self.params.v0]
    }

    fn drift(&self, _t: f64, state: &[f64]) -> Vec<f64> {
        let x = state[0];
        let v = state[1];
        vec![v, self.params.mu * (1.0 - x * x) * v - x]
    }

    fn diffusion(&self, _t: f64, _state: &[f64]) -> Vec<f64> {
        vec![0.0, self.params.sigma]
    }

    fn state_names(&self) -> Vec<String> {
        vec!["x".into(), "v".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_omitted() {
        let model = VanDerPolModel::from_value(&serde_yaml::Value::Mapping(Default::default()))
            .unwrap();
        assert_eq!(model.params.mu, 1.0);
        assert_eq!(model.params.sigma, 0.1);
    }

    #[test]
    fn drift_matches_deterministic_van_der_pol_equation() {
        let model = VanDerPolModel::from_value(&serde_yaml::from_str("mu: 2.0\nsigma: 0.0").unwrap())
            .unwrap();
        let d = model.drift(0.0, &[1.0, 0.5]);
        assert_eq!(d[0], 0.5);
        assert!((d[1] - (2.0 * (1.0 - 1.0) * 0.5 - 1.0)).abs() < 1e-12);
    }
}

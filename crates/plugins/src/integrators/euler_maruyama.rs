//! Vectorized Euler-Maruyama stepper, grounded on the source system's
//! `integrators/euler_maruyama.py`: `y_{t+dt} = y + drift(y,t)*dt +
//! diffusion(y,t)*dW`, with `dW = noise * sqrt(dt)`.
//!
//! Registered under several aliases in the engine registry (`euler`,
//! `em`) mirroring the original module's alias table; `milstein` is not
//! implemented here, plain Euler-Maruyama is used for all aliases.

use std::any::Any;

use simrun_core::error::CoreResult;
use simrun_core::plugins::Plugin;

use super::Stepper;

#[derive(Debug, Default)]
pub struct EulerMaruyama;

impl EulerMaruyama {
    pub fn from_value(_params: &serde_yaml::Value) -> CoreResult<Self> {
        Ok(EulerMaruyama)
    }
}

impl Plugin for EulerMaruyama {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Stepper for EulerMaruyama {
    fn step(&self, _t: f64, state: &[f64], dt: f64, drift: &[f64], diffusion: &[f64], noise: &[f64]) -> Vec<f64> {
        let sqrt_dt = dt.sqrt();
        state
            .iter()
            .zip(drift)
            .zip(diffusion)
            .zip(noise)
            .map(|(((y, d), g), n)| y + d * dt + g * n * sqrt_dt)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn zero_noise_reduces_to_deterministic_euler_step() {
        let stepper = EulerMaruyama;
        let next = stepper.step(0.0, &[1.0, 2.0], 0.1, &[0.5, -0.5], &[0.0, 0.0], &[1.0, 1.0]);
        assert!((next[0] - 1.05).abs() < 1e-12);
        assert!((next[1] - 1.95).abs() < 1e-12);
    }

    #[rstest]
    #[case::unit_dt(1.0, 2.0, 1.0, 3.0)]
    #[case::quarter_dt(0.25, 2.0, 1.0, 1.0)]
    #[case::tiny_dt(0.04, 0.0, 2.0, 0.4)]
    fn noise_is_scaled_by_sqrt_dt(
        #[case] dt: f64,
        #[case] drift: f64,
        #[case] diffusion: f64,
        #[case] expected: f64,
    ) {
        let stepper = EulerMaruyama;
        let next = stepper.step(0.0, &[0.0], dt, &[drift], &[diffusion], &[1.0]);
        assert!((next[0] - expected).abs() < 1e-12);
    }
}

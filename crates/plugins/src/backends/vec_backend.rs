use std::any::Any;

use simrun_core::error::CoreResult;
use simrun_core::plugins::Plugin;

use super::Backend;

#[derive(Debug, Default)]
pub struct NativeVecBackend;

impl NativeVecBackend {
    pub fn from_value(_params: &serde_yaml::Value) -> CoreResult<Self> {
        Ok(NativeVecBackend)
    }
}

impl Plugin for NativeVecBackend {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Backend for NativeVecBackend {
    fn zeros(&self, n: usize) -> Vec<f64> {
        vec![0.0; n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_allocates_requested_length() {
        let backend = NativeVecBackend;
        assert_eq!(backend.zeros(3), vec![0.0, 0.0, 0.0]);
    }
}

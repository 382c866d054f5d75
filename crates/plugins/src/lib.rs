//! Reference plugin implementations exercising every `simrun-core` extension
//! seam: a model, an integrator, an engine, a visualizer, and a loader.
//! Deliberately small — see `models` for why.

pub mod backends;
pub mod engines;
pub mod integrators;
pub mod loaders;
pub mod models;
pub mod result;
pub mod visualizers;

use std::sync::Arc;

use simrun_core::error::CoreResult;
use simrun_core::plugins::Plugin;
use simrun_core::registry::Registry;

use backends::NativeVecBackend;
use engines::SdeEngine;
use integrators::EulerMaruyama;
use loaders::CsvLoader;
use models::VanDerPolModel;
use visualizers::SummaryVisualizer;

/// Registers every plugin this crate ships under its conventional
/// namespace, so a binary can wire up a working registry with one call.
pub fn register_defaults(registry: &mut Registry) -> CoreResult<()> {
    registry.register_engine(
        "sde",
        Arc::new(SdeEngine::build),
        false,
    )?;

    registry.register(
        "model",
        "van_der_pol",
        Arc::new(|params: &serde_yaml::Value| {
            VanDerPolModel::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;

    registry.register(
        "integrator",
        "euler_maruyama",
        Arc::new(|params: &serde_yaml::Value| {
            EulerMaruyama::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;
    registry.register(
        "integrator",
        "euler",
        Arc::new(|params: &serde_yaml::Value| {
            EulerMaruyama::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;
    registry.register(
        "integrator",
        "em",
        Arc::new(|params: &serde_yaml::Value| {
            EulerMaruyama::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;

    registry.register(
        "backend",
        "native_vec",
        Arc::new(|params: &serde_yaml::Value| {
            NativeVecBackend::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;

    registry.register(
        "visualization",
        "summary",
        Arc::new(|params: &serde_yaml::Value| {
            SummaryVisualizer::from_value(params).map(|m| Box::new(m) as Box<dyn Plugin>)
        }),
        false,
        false,
    )?;

    registry.register_loader(
        "csv",
        Arc::new(|params: &serde_yaml::Value| {
            CsvLoader::from_value(params).map(|m| Box::new(m) as Box<dyn simrun_core::plugins::Loader>)
        }),
        false,
    )?;

    Ok(())
}

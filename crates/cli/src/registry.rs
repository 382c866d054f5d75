//! Builds the process-wide [`simrun_core::Registry`], wired up with every
//! plugin this distribution ships (`simrun-plugins`).

use simrun_core::{CoreResult, Registry};

pub fn build_registry() -> CoreResult<Registry> {
    let mut registry = Registry::new();
    simrun_plugins::register_defaults(&mut registry)?;
    Ok(registry)
}

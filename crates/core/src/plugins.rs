//! Plugin capability traits.
//!
//! The core treats every plugin kind as opaque beyond a narrow interface —
//! per `spec.md` §1, the numerical kernels, array backends, and model
//! definitions are external collaborators. Each trait below is the "capability
//! bundle of methods" called for in the Design Notes (`spec.md` §9):
//! downcasting from the erased `Box<dyn Plugin>` the registry hands back
//! happens at the one boundary that needs the concrete type — inside each
//! engine's own `run()`.

use std::any::Any;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CoreResult;

/// Marker capability every constructed plugin instance satisfies, letting
/// the registry store heterogeneous plugins behind one erased type and the
/// scheduler hand them to an engine without knowing their concrete shape.
pub trait Plugin: Debug {
    fn as_any(&self) -> &dyn Any;
}

/// A data/metadata bundle an engine hands back to the scheduler. Replaces
/// the `isinstance`-style duck typing in the source system with a narrow,
/// compile-time-checked contract (`spec.md` §9, "Result contract").
pub trait ResultObject: Debug {
    /// Backend-specific payload; downcast by whoever knows the concrete
    /// backend/engine pairing (a visualizer, an analysis plugin, a test).
    fn data(&self) -> &dyn Any;
    /// Free-form metadata the engine wants to travel with the result.
    fn metadata(&self) -> &serde_yaml::Value;
    /// Optional human-facing label distinct from the job name.
    fn label(&self) -> Option<&str> {
        None
    }
    /// Persist to `path`; the implementation chooses its own extension, per
    /// the deliberate looseness documented in `spec.md` §9.
    fn save(&self, path: &Path) -> CoreResult<PathBuf>;
}

/// One accepted progress update, matching the tuple contract in `spec.md`
/// §4.6 step 7: `(percent, total_duration_estimate_seconds, message, stage)`.
#[derive(Clone, Debug, Default)]
pub struct ProgressUpdate {
    pub percent: Option<f64>,
    pub total_duration_estimate_seconds: Option<f64>,
    pub message: String,
    pub stage: Option<String>,
}

/// Sink an engine invokes zero or more times during `run()`. Exceptions
/// (panics) from the observer must never propagate into the engine; see
/// `crate::scheduler::guarded_progress_cb`.
pub type ProgressSink<'a> = &'a mut dyn FnMut(ProgressUpdate);

/// The plugin that performs the primary computation for a job. Exactly one
/// engine runs per job.
pub trait Engine: Debug {
    /// Run to completion. `input` is the upstream `ResultObject`, if the
    /// job declared one and it resolved. `progress` is `Some` only when the
    /// scheduler decided this engine accepts progress reporting; engines
    /// that never call it are equally valid.
    fn run(
        &mut self,
        input: Option<Arc<dyn ResultObject>>,
        progress: Option<ProgressSink<'_>>,
    ) -> CoreResult<Box<dyn ResultObject>>;

    /// Feature detection used by the scheduler to decide whether to pass a
    /// progress sink at all (`spec.md` §4.6 step 7 / scenario S6). Engines
    /// that ignore the sink even when it is passed are harmless; this flag
    /// exists so the scheduler can log that progress is disabled rather
    /// than silently doing nothing.
    fn accepts_progress(&self) -> bool {
        true
    }
}

/// Named set of constructed plugin instances handed to an engine, keyed
/// both by kind (`"backend"`) and kind-dot-name (`"backend.numpy"`), per
/// `spec.md` §4.6 step 4.
pub type PluginSet = std::collections::BTreeMap<String, Arc<dyn Plugin>>;

/// Factory for a non-engine plugin: takes the plugin's own validated
/// parameter tree and produces a boxed, type-erased instance.
pub type PluginFactory = Arc<dyn Fn(&serde_yaml::Value) -> CoreResult<Box<dyn Plugin>> + Send + Sync>;

/// Factory for an engine: takes its parameter tree and the fully-built
/// plugin set for the job.
pub type EngineFactory =
    Arc<dyn Fn(&serde_yaml::Value, &PluginSet) -> CoreResult<Box<dyn Engine>> + Send + Sync>;

/// Resolves an unrecognized `input` reference (a path, URI, or other
/// external handle) into a `ResultObject` an engine can consume. A separate,
/// typed sub-registry from the generic plugin namespaces, for the same
/// reason `Engine` gets one: the scheduler needs to call a method on the
/// concrete return value, not merely hold it behind `Plugin`.
pub trait Loader: Debug {
    fn load(&self, reference: &str) -> CoreResult<Arc<dyn ResultObject>>;
}

/// Factory for a loader: takes its own parameter tree (e.g. credentials, a
/// base directory) and produces a boxed loader instance.
pub type LoaderFactory = Arc<dyn Fn(&serde_yaml::Value) -> CoreResult<Box<dyn Loader>> + Send + Sync>;

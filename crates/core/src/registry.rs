//! Namespaced plugin registry: `(namespace, name) -> factory`.
//!
//! Grounded on the source system's `RegistryCenter` (`register`,
//! `register_lazy`, decorator-style self-registration, `create("ns:name")`,
//! `list`) and on the registry-as-explicit-value idiom used by
//! `alloy-runtime`'s `BotRegistry` — an owned value threaded through
//! construction rather than a process-wide singleton, with a convenience
//! default for CLI use (`spec.md` §9, "Global mutable registry").

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{CoreError, CoreResult, UnresolvableKind};
use crate::plugins::{Engine, EngineFactory, Loader, LoaderFactory, Plugin, PluginFactory};

/// One of the fixed namespaces named in `spec.md` §4.1, plus any ad-hoc
/// namespace a third party registers under.
pub const NAMESPACES: &[&str] = &[
    "engine",
    "backend",
    "integrator",
    "model",
    "noise_model",
    "analysis",
    "visualization",
    "loader",
    "default",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryKind {
    Callable,
    Dotted,
}

struct Entry<F> {
    kind: EntryKind,
    factory: F,
    return_callable: bool,
    dotted_path: Option<String>,
}

struct Table<F>(BTreeMap<String, Entry<F>>);

impl<F> Default for Table<F> {
    fn default() -> Self {
        Table(BTreeMap::new())
    }
}

impl<F> Table<F> {
    fn register(
        &mut self,
        name: &str,
        factory: F,
        overwrite: bool,
        return_callable: bool,
    ) -> Result<(), ()> {
        let key = name.trim().to_lowercase();
        if !overwrite && self.0.contains_key(&key) {
            return Err(());
        }
        self.0.insert(
            key,
            Entry {
                kind: EntryKind::Callable,
                factory,
                return_callable,
                dotted_path: None,
            },
        );
        Ok(())
    }

    fn register_lazy(
        &mut self,
        name: &str,
        target: &str,
        factory: F,
        overwrite: bool,
        return_callable: bool,
    ) -> Result<(), ()> {
        let key = name.trim().to_lowercase();
        if !overwrite && self.0.contains_key(&key) {
            return Err(());
        }
        self.0.insert(
            key,
            Entry {
                kind: EntryKind::Dotted,
                factory,
                return_callable,
                dotted_path: Some(target.to_string()),
            },
        );
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Entry<F>> {
        self.0.get(&name.trim().to_lowercase())
    }

    fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

/// Returned by `create` for an entry whose *return_callable* flag is set:
/// the raw factory, uninvoked, wrapped so it can still travel behind
/// `Arc<dyn Plugin>`. A caller that knows it registered a callable-returning
/// entry downcasts `as_any()` back to `CallableHandle` to get at `.0`.
pub struct CallableHandle(pub PluginFactory);

impl std::fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallableHandle(..)")
    }
}

impl Plugin for CallableHandle {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Returned by `create_engine` for an entry whose *return_callable* flag is
/// set: wraps the raw factory and its arguments without invoking it. The
/// underlying engine is built on the first call to `run`, not at
/// `create_engine` time.
struct CallableEngine {
    factory: EngineFactory,
    params: serde_yaml::Value,
    plugin_set: crate::plugins::PluginSet,
}

impl std::fmt::Debug for CallableEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallableEngine(..)")
    }
}

impl Engine for CallableEngine {
    fn run(
        &mut self,
        input: Option<Arc<dyn crate::plugins::ResultObject>>,
        progress: Option<crate::plugins::ProgressSink<'_>>,
    ) -> CoreResult<Box<dyn crate::plugins::ResultObject>> {
        let mut engine = (self.factory)(&self.params, &self.plugin_set)?;
        engine.run(input, progress)
    }
}

/// Returned by `create_loader` for an entry whose *return_callable* flag is
/// set: the underlying loader is built on the first call to `load`.
struct CallableLoader {
    factory: LoaderFactory,
    params: serde_yaml::Value,
}

impl std::fmt::Debug for CallableLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallableLoader(..)")
    }
}

impl Loader for CallableLoader {
    fn load(&self, reference: &str) -> CoreResult<Arc<dyn crate::plugins::ResultObject>> {
        let loader = (self.factory)(&self.params)?;
        loader.load(reference)
    }
}

/// Split `"namespace:name"` into its parts, defaulting the namespace to
/// `"default"` when absent, per `spec.md` §4.1.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once(':') {
        Some((ns, nm)) => (ns.trim().to_lowercase(), nm.trim().to_lowercase()),
        None => ("default".to_string(), full_name.trim().to_lowercase()),
    }
}

/// The plugin registry. An explicit value — construct one per process (or
/// per test) rather than reaching for a global singleton.
#[derive(Default)]
pub struct Registry {
    engines: Table<EngineFactory>,
    loaders: Table<LoaderFactory>,
    plugins: BTreeMap<String, Table<PluginFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn plugin_table_mut(&mut self, namespace: &str) -> &mut Table<PluginFactory> {
        self.plugins
            .entry(namespace.trim().to_lowercase())
            .or_default()
    }

    fn plugin_table(&self, namespace: &str) -> Option<&Table<PluginFactory>> {
        self.plugins.get(&namespace.trim().to_lowercase())
    }

    // ----- engine namespace -----

    #[tracing::instrument(skip(self, builder))]
    pub fn register_engine(
        &mut self,
        name: &str,
        builder: EngineFactory,
        overwrite: bool,
    ) -> CoreResult<()> {
        self.register_engine_with(name, builder, overwrite, false)
    }

    /// As [`Registry::register_engine`], but lets the caller set the
    /// *return_callable* flag (`spec.md` §4.1): when set, `create_engine`
    /// hands back an `Engine` that defers invoking `builder` until `run` is
    /// first called, instead of building the product eagerly.
    #[tracing::instrument(skip(self, builder))]
    pub fn register_engine_with(
        &mut self,
        name: &str,
        builder: EngineFactory,
        overwrite: bool,
        return_callable: bool,
    ) -> CoreResult<()> {
        trace!(name, "register_engine");
        self.engines
            .register(name, builder, overwrite, return_callable)
            .map_err(|_| CoreError::DuplicateRegistration {
                namespace: "engine".into(),
                name: name.to_string(),
            })
    }

    pub fn create_engine(
        &self,
        name: &str,
        params: &serde_yaml::Value,
        plugin_set: &crate::plugins::PluginSet,
    ) -> CoreResult<Box<dyn Engine>> {
        let key = name.trim().to_lowercase();
        let entry = self.engines.get(&key).ok_or_else(|| CoreError::UnknownKey {
            namespace: "engine".into(),
            name: key.clone(),
        })?;
        if entry.return_callable {
            return Ok(Box::new(CallableEngine {
                factory: entry.factory.clone(),
                params: params.clone(),
                plugin_set: plugin_set.clone(),
            }));
        }
        match (entry.factory)(params, plugin_set) {
            Ok(engine) => Ok(engine),
            Err(e) if entry.kind == EntryKind::Dotted => Err(CoreError::UnresolvableTarget {
                namespace: "engine".into(),
                name: key,
                kind: UnresolvableKind::Generic,
                detail: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    // ----- loader namespace -----

    #[tracing::instrument(skip(self, builder))]
    pub fn register_loader(
        &mut self,
        name: &str,
        builder: LoaderFactory,
        overwrite: bool,
    ) -> CoreResult<()> {
        self.register_loader_with(name, builder, overwrite, false)
    }

    /// As [`Registry::register_loader`], but lets the caller set the
    /// *return_callable* flag: `create_loader` then hands back a `Loader`
    /// that defers invoking `builder` until `load` is first called.
    #[tracing::instrument(skip(self, builder))]
    pub fn register_loader_with(
        &mut self,
        name: &str,
        builder: LoaderFactory,
        overwrite: bool,
        return_callable: bool,
    ) -> CoreResult<()> {
        trace!(name, "register_loader");
        self.loaders
            .register(name, builder, overwrite, return_callable)
            .map_err(|_| CoreError::DuplicateRegistration {
                namespace: "loader".into(),
                name: name.to_string(),
            })
    }

    pub fn create_loader(&self, name: &str, params: &serde_yaml::Value) -> CoreResult<Box<dyn Loader>> {
        let key = name.trim().to_lowercase();
        let entry = self.loaders.get(&key).ok_or_else(|| CoreError::UnknownKey {
            namespace: "loader".into(),
            name: key.clone(),
        })?;
        if entry.return_callable {
            return Ok(Box::new(CallableLoader {
                factory: entry.factory.clone(),
                params: params.clone(),
            }));
        }
        match (entry.factory)(params) {
            Ok(loader) => Ok(loader),
            Err(e) if entry.kind == EntryKind::Dotted => Err(CoreError::UnresolvableTarget {
                namespace: "loader".into(),
                name: key,
                kind: UnresolvableKind::Generic,
                detail: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    pub fn has_any_loader(&self) -> bool {
        !self.loaders.names().is_empty()
    }

    // ----- generic plugin namespaces (backend, integrator, model, ...) -----

    #[tracing::instrument(skip(self, builder))]
    pub fn register(
        &mut self,
        namespace: &str,
        name: &str,
        builder: PluginFactory,
        overwrite: bool,
        return_callable: bool,
    ) -> CoreResult<()> {
        trace!(namespace, name, "register");
        self.plugin_table_mut(namespace)
            .register(name, builder, overwrite, return_callable)
            .map_err(|_| CoreError::DuplicateRegistration {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    #[tracing::instrument(skip(self, builder))]
    pub fn register_lazy(
        &mut self,
        namespace: &str,
        name: &str,
        target: &str,
        builder: PluginFactory,
        overwrite: bool,
        return_callable: bool,
    ) -> CoreResult<()> {
        trace!(namespace, name, target, "register_lazy");
        self.plugin_table_mut(namespace)
            .register_lazy(name, target, builder, overwrite, return_callable)
            .map_err(|_| CoreError::DuplicateRegistration {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// `create("namespace:name", params)`. For dotted entries, factory
    /// failure is reported as `unresolvable-target`, distinguishing
    /// `backend`/`visualization`/generic per `spec.md` §4.1.
    pub fn create(&self, full_name: &str, params: &serde_yaml::Value) -> CoreResult<Arc<dyn Plugin>> {
        let (namespace, name) = split_full_name(full_name);
        let table = self
            .plugin_table(&namespace)
            .ok_or_else(|| CoreError::UnknownKey {
                namespace: namespace.clone(),
                name: name.clone(),
            })?;
        let entry = table.get(&name).ok_or_else(|| CoreError::UnknownKey {
            namespace: namespace.clone(),
            name: name.clone(),
        })?;
        if entry.return_callable {
            return Ok(Arc::new(CallableHandle(entry.factory.clone())) as Arc<dyn Plugin>);
        }
        let built = (entry.factory)(params);
        match built {
            Ok(plugin) => Ok(Arc::from(plugin)),
            Err(e) if entry.kind == EntryKind::Dotted => {
                let kind = match namespace.as_str() {
                    "backend" => UnresolvableKind::Backend,
                    "visualization" => UnresolvableKind::Visualizer,
                    _ => UnresolvableKind::Generic,
                };
                Err(CoreError::UnresolvableTarget {
                    namespace,
                    name,
                    kind,
                    detail: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Enumerate registered names, optionally scoped to one namespace.
    pub fn list(&self, namespace: Option<&str>) -> BTreeMap<String, Vec<String>> {
        match namespace {
            Some(ns) => {
                let mut out = BTreeMap::new();
                if let Some(table) = self.plugin_table(ns) {
                    out.insert(ns.trim().to_lowercase(), table.names());
                } else if ns.eq_ignore_ascii_case("engine") {
                    out.insert("engine".to_string(), self.engines.names());
                } else if ns.eq_ignore_ascii_case("loader") {
                    out.insert("loader".to_string(), self.loaders.names());
                }
                out
            }
            None => {
                let mut out: BTreeMap<String, Vec<String>> = self
                    .plugins
                    .iter()
                    .map(|(ns, t)| (ns.clone(), t.names()))
                    .collect();
                out.insert("engine".to_string(), self.engines.names());
                out.insert("loader".to_string(), self.loaders.names());
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::ResultObject;
    use std::any::Any;
    use std::fmt;

    #[derive(Debug)]
    struct Dummy(i64);
    impl Plugin for Dummy {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn dummy_factory() -> PluginFactory {
        Arc::new(|_params| Ok(Box::new(Dummy(42)) as Box<dyn Plugin>))
    }

    #[test]
    fn register_then_create_roundtrips() {
        let mut reg = Registry::new();
        reg.register("backend", "numpy", dummy_factory(), false, false)
            .unwrap();
        let created = reg.create("backend:numpy", &serde_yaml::Value::Null).unwrap();
        let d = created.as_any().downcast_ref::<Dummy>().unwrap();
        assert_eq!(d.0, 42);
    }

    #[test]
    fn default_namespace_when_omitted() {
        let mut reg = Registry::new();
        reg.register("default", "thing", dummy_factory(), false, false)
            .unwrap();
        assert!(reg.create("thing", &serde_yaml::Value::Null).is_ok());
    }

    #[test]
    fn duplicate_registration_rejected_without_overwrite() {
        let mut reg = Registry::new();
        reg.register("backend", "numpy", dummy_factory(), false, false)
            .unwrap();
        let err = reg
            .register("backend", "numpy", dummy_factory(), false, false)
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRegistration { .. }));
    }

    #[test]
    fn overwrite_allows_replacement() {
        let mut reg = Registry::new();
        reg.register("backend", "numpy", dummy_factory(), false, false)
            .unwrap();
        assert!(reg
            .register("backend", "numpy", dummy_factory(), true, false)
            .is_ok());
    }

    #[test]
    fn unknown_key_on_missing_entry() {
        let reg = Registry::new();
        let err = reg.create("backend:nope", &serde_yaml::Value::Null).unwrap_err();
        assert!(matches!(err, CoreError::UnknownKey { .. }));
    }

    #[test]
    fn return_callable_hands_back_the_factory_uninvoked() {
        let mut reg = Registry::new();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counted = calls.clone();
        let factory: PluginFactory = Arc::new(move |_params| {
            counted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Box::new(Dummy(7)) as Box<dyn Plugin>)
        });
        reg.register("backend", "lazy", factory, false, true)
            .unwrap();

        let handle = reg.create("backend:lazy", &serde_yaml::Value::Null).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let callable = handle
            .as_any()
            .downcast_ref::<CallableHandle>()
            .expect("return_callable entry yields a CallableHandle");
        let produced = (callable.0)(&serde_yaml::Value::Null).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(
            produced.as_any().downcast_ref::<Dummy>().unwrap().0,
            7
        );
    }

    #[derive(Debug)]
    struct StubEngine;
    impl Engine for StubEngine {
        fn run(
            &mut self,
            _input: Option<Arc<dyn crate::plugins::ResultObject>>,
            _progress: Option<crate::plugins::ProgressSink<'_>>,
        ) -> CoreResult<Box<dyn crate::plugins::ResultObject>> {
            Ok(Box::new(DummyResult))
        }
    }

    #[test]
    fn return_callable_engine_defers_construction_to_first_run() {
        let mut reg = Registry::new();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counted = calls.clone();
        let factory: EngineFactory = Arc::new(move |_params, _plugins| {
            counted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Box::new(StubEngine) as Box<dyn Engine>)
        });
        reg.register_engine_with("lazy", factory, false, true)
            .unwrap();

        let mut engine = reg
            .create_engine(
                "lazy",
                &serde_yaml::Value::Null,
                &crate::plugins::PluginSet::new(),
            )
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        engine.run(None, None).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_registration_reports_unresolvable_target_on_failure() {
        let mut reg = Registry::new();
        let failing: PluginFactory = Arc::new(|_p| {
            Err(CoreError::EngineInitFailed {
                job: "x".into(),
                name: "torch".into(),
                detail: "module not found".into(),
            })
        });
        reg.register_lazy("backend", "torch", "simrun_plugins::backends::Torch", failing, false, false)
            .unwrap();
        let err = reg.create("backend:torch", &serde_yaml::Value::Null).unwrap_err();
        match err {
            CoreError::UnresolvableTarget { kind, .. } => {
                assert_eq!(kind, UnresolvableKind::Backend)
            }
            other => panic!("expected UnresolvableTarget, got {other:?}"),
        }
    }

    #[test]
    fn list_enumerates_namespaces() {
        let mut reg = Registry::new();
        reg.register("backend", "numpy", dummy_factory(), false, false)
            .unwrap();
        reg.register("model", "vdp", dummy_factory(), false, false)
            .unwrap();
        let all = reg.list(None);
        assert_eq!(all.get("backend").unwrap(), &vec!["numpy".to_string()]);
        assert_eq!(all.get("model").unwrap(), &vec!["vdp".to_string()]);
    }

    #[derive(Debug)]
    struct DummyResult;
    impl ResultObject for DummyResult {
        fn data(&self) -> &dyn Any {
            self
        }
        fn metadata(&self) -> &serde_yaml::Value {
            static NULL: serde_yaml::Value = serde_yaml::Value::Null;
            &NULL
        }
        fn save(&self, path: &std::path::Path) -> CoreResult<std::path::PathBuf> {
            Ok(path.to_path_buf())
        }
    }

    #[allow(dead_code)]
    fn _assert_result_object_is_object_safe(_r: &dyn ResultObject) {}

    #[allow(dead_code)]
    fn _silence_unused(_f: impl fmt::Debug) {}
}

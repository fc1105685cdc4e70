//! Module resolution capability.
//!
//! A module reference in a dependency declaration is a name; what it points at
//! is decided by a [`ModuleResolver`] injected into the container. The
//! in-process [`StaticModules`] table is what the binary and the tests use.

use std::collections::HashMap;
use std::sync::Arc;

use crate::app::AppContext;
use crate::container::{BoxError, Instance};

/// Constructor of a constructible module export.
pub type ConstructorFn =
    Arc<dyn Fn(&AppContext, &[serde_json::Value]) -> Result<Instance, BoxError> + Send + Sync>;

/// What a module reference resolves to.
#[derive(Clone)]
pub enum ModuleExport {
    /// A type the container instantiates, receiving the app context first.
    Constructible(ConstructorFn),
    /// A ready-made value used as the instance.
    Value(Instance),
}

impl std::fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleExport::Constructible(_) => f.write_str("ModuleExport::Constructible"),
            ModuleExport::Value(_) => f.write_str("ModuleExport::Value"),
        }
    }
}

/// Capability turning a module reference into an export.
pub trait ModuleResolver: Send + Sync {
    /// Look up a module reference. `None` if nothing is exported under it.
    fn resolve(&self, module_ref: &str) -> Option<ModuleExport>;
}

/// A fixed table of module exports.
#[derive(Clone, Default)]
pub struct StaticModules {
    exports: HashMap<String, ModuleExport>,
}

impl StaticModules {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a constructible type under `module_ref`.
    pub fn constructible<T, F>(mut self, module_ref: impl Into<String>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&AppContext, &[serde_json::Value]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let constructor: ConstructorFn = Arc::new(move |app: &AppContext, args: &[serde_json::Value]| {
            constructor(app, args).map(|value| Arc::new(value) as Instance)
        });
        self.exports
            .insert(module_ref.into(), ModuleExport::Constructible(constructor));
        self
    }

    /// Export a plain value under `module_ref`.
    pub fn value<T>(mut self, module_ref: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.exports
            .insert(module_ref.into(), ModuleExport::Value(Arc::new(value)));
        self
    }

    /// Number of exported modules.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// True if nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl ModuleResolver for StaticModules {
    fn resolve(&self, module_ref: &str) -> Option<ModuleExport> {
        self.exports.get(module_ref).cloned()
    }
}

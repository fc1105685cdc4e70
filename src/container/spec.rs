//! Dependency declarations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::app::AppContext;
use crate::container::{BoxError, Instance};

/// Lifetime policy of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Lifetime {
    /// One instance per container, built on first use.
    #[default]
    #[serde(rename = "Lifetime", alias = "singleton")]
    Singleton,
    /// A fresh instance on every resolution.
    #[serde(rename = "SingleUse", alias = "transient")]
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}

/// Arguments handed to builders and configure hooks.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The owning application.
    pub app: AppContext,
    /// Module reference of the entry, when it has one.
    pub module: Option<String>,
    /// Registered name of the dependency being built.
    pub type_name: String,
    /// Extra arguments supplied by the caller of `resolve_with`.
    pub args: Vec<serde_json::Value>,
}

pub(crate) type BuilderFn =
    Arc<dyn Fn(BuildContext) -> BoxFuture<'static, Result<Instance, BoxError>> + Send + Sync>;

pub(crate) type ConfigureFn = Arc<
    dyn Fn(Instance, BuildContext) -> BoxFuture<'static, Result<Option<Instance>, BoxError>>
        + Send
        + Sync,
>;

/// A dependency declaration, as handed to [`DependencyContainer::register`].
///
/// Exactly one of [`module`](Self::module) or [`builder`](Self::builder) must
/// be set; the container rejects anything else.
///
/// [`DependencyContainer::register`]: crate::container::DependencyContainer::register
#[derive(Clone, Default)]
pub struct DependencySpec {
    pub(crate) module: Option<String>,
    pub(crate) builder: Option<BuilderFn>,
    pub(crate) lifetime: Lifetime,
    pub(crate) configure: Option<ConfigureFn>,
}

impl DependencySpec {
    /// An empty declaration. Register it only after adding a source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaration backed by a module reference.
    pub fn module(module_ref: impl Into<String>) -> Self {
        Self::new().with_module(module_ref)
    }

    /// Declaration backed by an async builder function.
    pub fn builder<F, Fut, T>(builder: F) -> Self
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        Self::new().with_builder(builder)
    }

    /// Set the module reference.
    pub fn with_module(mut self, module_ref: impl Into<String>) -> Self {
        self.module = Some(module_ref.into());
        self
    }

    /// Set the builder function.
    pub fn with_builder<F, Fut, T>(mut self, builder: F) -> Self
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.builder = Some(Arc::new(move |ctx: BuildContext| {
            let fut = builder(ctx);
            async move { fut.await.map(|value| Arc::new(value) as Instance) }.boxed()
        }));
        self
    }

    /// Set the lifetime policy.
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Shorthand for `lifetime(Lifetime::Transient)`.
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// Post-construct hook. Returning `Some` replaces the constructed instance.
    pub fn configure<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Instance, BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Instance>, BoxError>> + Send + 'static,
    {
        self.configure = Some(Arc::new(move |instance: Instance, ctx: BuildContext| {
            hook(instance, ctx).boxed()
        }));
        self
    }

    /// The configured lifetime policy.
    pub fn lifetime_policy(&self) -> Lifetime {
        self.lifetime
    }

    /// Exactly one source is present.
    pub(crate) fn has_single_source(&self) -> bool {
        self.module.is_some() != self.builder.is_some()
    }
}

impl fmt::Debug for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencySpec")
            .field("module", &self.module)
            .field("builder", &self.builder.is_some())
            .field("lifetime", &self.lifetime)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

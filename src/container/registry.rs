//! The dependency container.
//!
//! # Responsibilities
//! - Hold named dependency entries
//! - Resolve names to instances according to their lifetime
//! - Run module constructors, builders and configure hooks
//!
//! # Design Decisions
//! - Entries are cloned out of the map before any await, no shard lock is
//!   held across construction
//! - Singleton caching goes through a per-entry `OnceCell`: concurrent first
//!   resolutions wait on one construction instead of racing
//! - A failed construction leaves the cell empty, the next resolution retries

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::app::AppContext;
use crate::config::DependencyConfig;
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::modules::{ModuleExport, ModuleResolver};
use crate::container::spec::{BuildContext, DependencySpec, Lifetime};
use crate::container::Instance;
use crate::observability::metrics;

/// A registered dependency.
struct DependencyEntry {
    spec: DependencySpec,
    cached: OnceCell<Instance>,
}

/// Resolves named dependencies into live instances.
#[derive(Clone)]
pub struct DependencyContainer {
    app: AppContext,
    modules: Arc<dyn ModuleResolver>,
    entries: Arc<DashMap<String, Arc<DependencyEntry>>>,
}

impl DependencyContainer {
    /// Create an empty container owned by `app`.
    pub fn new(app: AppContext, modules: Arc<dyn ModuleResolver>) -> Self {
        Self {
            app,
            modules,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Register a dependency under `name`.
    ///
    /// Fails with `DuplicateKey` if the name is taken and `overwrite` is false,
    /// and with `InvalidSpec` unless exactly one source is declared.
    /// Overwriting drops any singleton cached for the old entry.
    pub fn register(
        &self,
        name: impl Into<String>,
        spec: DependencySpec,
        overwrite: bool,
    ) -> ContainerResult<()> {
        let name = name.into();

        if !spec.has_single_source() {
            return Err(ContainerError::InvalidSpec(name));
        }

        let entry = Arc::new(DependencyEntry {
            spec,
            cached: OnceCell::new(),
        });

        match self.entries.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if !overwrite {
                    return Err(ContainerError::DuplicateKey(occupied.key().clone()));
                }
                tracing::debug!(dependency = %occupied.key(), "Overwriting dependency");
                occupied.insert(entry);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                tracing::debug!(
                    dependency = %vacant.key(),
                    lifetime = %entry.spec.lifetime,
                    "Dependency registered"
                );
                vacant.insert(entry);
            }
        }
        Ok(())
    }

    /// Register every dependency declared under `[dependencies]`.
    ///
    /// Stops at the first failure. Returns the number registered.
    pub fn register_configured(
        &self,
        declared: &BTreeMap<String, DependencyConfig>,
    ) -> ContainerResult<usize> {
        for (name, decl) in declared {
            let spec = DependencySpec::module(decl.module.clone()).lifetime(decl.lifespan);
            self.register(name.clone(), spec, decl.overwrite)?;
        }
        if !declared.is_empty() {
            tracing::info!(count = declared.len(), "Configured dependencies registered");
        }
        Ok(declared.len())
    }

    /// Resolve `name` to an instance.
    pub async fn resolve(&self, name: &str) -> ContainerResult<Instance> {
        self.resolve_with(name, Vec::new()).await
    }

    /// Resolve `name`, handing `args` to the constructor or builder.
    ///
    /// Arguments only matter on construction; a cached singleton ignores them.
    pub async fn resolve_with(
        &self,
        name: &str,
        args: Vec<serde_json::Value>,
    ) -> ContainerResult<Instance> {
        let entry = self
            .entries
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| ContainerError::UnknownDependency(name.to_string()))?;

        match entry.spec.lifetime {
            Lifetime::Singleton => {
                if let Some(instance) = entry.cached.get() {
                    metrics::record_resolution(Lifetime::Singleton, true);
                    return Ok(instance.clone());
                }
                let instance = entry
                    .cached
                    .get_or_try_init(|| self.construct(name, &entry.spec, args))
                    .await?
                    .clone();
                metrics::record_resolution(Lifetime::Singleton, false);
                Ok(instance)
            }
            Lifetime::Transient => {
                let instance = self.construct(name, &entry.spec, args).await?;
                metrics::record_resolution(Lifetime::Transient, false);
                Ok(instance)
            }
        }
    }

    /// Resolve several names, in order, one after the other.
    pub async fn resolve_many<S: AsRef<str>>(&self, names: &[S]) -> ContainerResult<Vec<Instance>> {
        let mut instances = Vec::with_capacity(names.len());
        for name in names {
            instances.push(self.resolve(name.as_ref()).await?);
        }
        Ok(instances)
    }

    /// Resolve `name` and downcast it to `T`.
    pub async fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.resolve(name)
            .await?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `name` is a singleton whose instance has been built.
    pub fn is_singleton_cached(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|r| r.value().cached.initialized())
            .unwrap_or(false)
    }

    async fn construct(
        &self,
        name: &str,
        spec: &DependencySpec,
        args: Vec<serde_json::Value>,
    ) -> ContainerResult<Instance> {
        tracing::debug!(dependency = %name, lifetime = %spec.lifetime, "Constructing dependency");

        let ctx = BuildContext {
            app: self.app.clone(),
            module: spec.module.clone(),
            type_name: name.to_string(),
            args,
        };

        let instance = if let Some(module_ref) = &spec.module {
            let export = self.modules.resolve(module_ref).ok_or_else(|| {
                ContainerError::ModuleNotFound {
                    name: name.to_string(),
                    module: module_ref.clone(),
                }
            })?;
            match export {
                ModuleExport::Constructible(constructor) => {
                    constructor(&self.app, &ctx.args).map_err(|source| {
                        ContainerError::Construction {
                            name: name.to_string(),
                            source,
                        }
                    })?
                }
                ModuleExport::Value(value) => value,
            }
        } else if let Some(builder) = &spec.builder {
            builder(ctx.clone())
                .await
                .map_err(|source| ContainerError::Construction {
                    name: name.to_string(),
                    source,
                })?
        } else {
            // register() refuses specs without a source.
            return Err(ContainerError::InvalidSpec(name.to_string()));
        };

        match &spec.configure {
            Some(hook) => {
                let configured = hook(instance.clone(), ctx)
                    .await
                    .map_err(|source| ContainerError::Construction {
                        name: name.to_string(),
                        source,
                    })?;
                Ok(configured.unwrap_or(instance))
            }
            None => Ok(instance),
        }
    }
}

impl std::fmt::Debug for DependencyContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyContainer")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{BoxError, StaticModules};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Vault {
        app_name: String,
    }

    fn container() -> DependencyContainer {
        let mut config = crate::config::AppConfig::default();
        config.name = "test-app".to_string();
        let modules = StaticModules::new()
            .constructible("vault", |app: &AppContext, _args: &[serde_json::Value]| {
                Ok(Vault { app_name: app.name() })
            })
            .value("greeting", "hello".to_string());
        DependencyContainer::new(AppContext::new(config), Arc::new(modules))
    }

    #[test]
    fn test_register_requires_exactly_one_source() {
        let container = container();

        let err = container.register("empty", DependencySpec::new(), false).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidSpec(name) if name == "empty"));

        let both = DependencySpec::module("vault").with_builder(|_| async { Ok::<_, BoxError>(1u8) });
        let err = container.register("both", both, false).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidSpec(_)));
        assert!(container.is_empty());
    }

    #[test]
    fn test_register_duplicate_requires_overwrite() {
        let container = container();
        container.register("vault", DependencySpec::module("vault"), false).unwrap();

        let err = container
            .register("vault", DependencySpec::module("vault"), false)
            .unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateKey(name) if name == "vault"));

        container.register("vault", DependencySpec::module("vault"), true).unwrap();
        assert_eq!(container.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_dependency() {
        let err = container().resolve("missing").await.unwrap_err();
        assert!(matches!(err, ContainerError::UnknownDependency(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_singleton_returns_same_instance() {
        let container = container();
        container.register("vault", DependencySpec::module("vault"), false).unwrap();
        assert!(!container.is_singleton_cached("vault"));

        let a = container.resolve("vault").await.unwrap();
        let b = container.resolve("vault").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(container.is_singleton_cached("vault"));

        let vault = container.resolve_as::<Vault>("vault").await.unwrap();
        assert_eq!(vault.app_name, "test-app");
    }

    #[tokio::test]
    async fn test_transient_returns_fresh_instances() {
        let container = container();
        container
            .register("vault", DependencySpec::module("vault").transient(), false)
            .unwrap();

        let a = container.resolve("vault").await.unwrap();
        let b = container.resolve("vault").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!container.is_singleton_cached("vault"));
    }

    #[tokio::test]
    async fn test_value_export_is_used_as_instance() {
        let container = container();
        container.register("greeting", DependencySpec::module("greeting"), false).unwrap();

        let greeting = container.resolve_as::<String>("greeting").await.unwrap();
        assert_eq!(greeting.as_str(), "hello");

        let err = container.resolve_as::<Vault>("greeting").await.unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_module() {
        let container = container();
        container.register("db", DependencySpec::module("postgres"), false).unwrap();

        let err = container.resolve("db").await.unwrap_err();
        assert!(matches!(err, ContainerError::ModuleNotFound { module, .. } if module == "postgres"));
    }

    #[tokio::test]
    async fn test_builder_receives_context_and_args() {
        let container = container();
        container
            .register(
                "echo",
                DependencySpec::builder(|ctx: BuildContext| async move {
                    Ok::<_, BoxError>(format!("{}:{}", ctx.type_name, ctx.args.len()))
                })
                .transient(),
                false,
            )
            .unwrap();

        let echo = container
            .resolve_with("echo", vec![serde_json::json!(1), serde_json::json!(2)])
            .await
            .unwrap();
        assert_eq!(echo.downcast_ref::<String>().unwrap(), "echo:2");
    }

    #[tokio::test]
    async fn test_configure_hook_can_replace_instance() {
        let container = container();
        container
            .register(
                "wrapped",
                DependencySpec::module("greeting").configure(|instance: Instance, ctx: BuildContext| async move {
                    assert_eq!(ctx.module.as_deref(), Some("greeting"));
                    let inner = instance.downcast_ref::<String>().cloned().unwrap_or_default();
                    Ok::<_, BoxError>(Some(Arc::new(format!("{inner}, world")) as Instance))
                }),
                false,
            )
            .unwrap();

        let wrapped = container.resolve_as::<String>("wrapped").await.unwrap();
        assert_eq!(wrapped.as_str(), "hello, world");
    }

    #[tokio::test]
    async fn test_configure_hook_returning_none_keeps_instance() {
        let container = container();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        container
            .register(
                "greeting",
                DependencySpec::module("greeting").configure(move |_instance: Instance, _ctx: BuildContext| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, BoxError>(None)
                    }
                }),
                false,
            )
            .unwrap();

        let greeting = container.resolve_as::<String>("greeting").await.unwrap();
        assert_eq!(greeting.as_str(), "hello");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_construction_error_propagates_and_retries() {
        let container = container();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        container
            .register(
                "flaky",
                DependencySpec::builder(move |_ctx: BuildContext| {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err::<u32, BoxError>("backend unavailable".into())
                        } else {
                            Ok(7)
                        }
                    }
                }),
                false,
            )
            .unwrap();

        let err = container.resolve("flaky").await.unwrap_err();
        assert!(matches!(err, ContainerError::Construction { ref name, .. } if name == "flaky"));
        assert!(err.to_string().contains("backend unavailable"));
        assert!(!container.is_singleton_cached("flaky"));

        let value = container.resolve_as::<u32>("flaky").await.unwrap();
        assert_eq!(*value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_constructs_once() {
        let container = container();
        let constructions = Arc::new(AtomicUsize::new(0));
        let counter = constructions.clone();
        container
            .register(
                "slow",
                DependencySpec::builder(move |_ctx: BuildContext| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, BoxError>(String::from("slow"))
                    }
                }),
                false,
            )
            .unwrap();

        let (a, b) = tokio::join!(container.resolve("slow"), container.resolve("slow"));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_many_is_ordered_and_sequential() {
        let container = container();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = order.clone();
            container
                .register(
                    name,
                    DependencySpec::builder(move |ctx: BuildContext| {
                        let order = order.clone();
                        async move {
                            order.lock().unwrap().push(ctx.type_name.clone());
                            Ok::<_, BoxError>(ctx.type_name)
                        }
                    }),
                    false,
                )
                .unwrap();
        }

        let instances = container.resolve_many(&["third", "first", "second"]).await.unwrap();
        let names: Vec<&str> = instances
            .iter()
            .map(|i| i.downcast_ref::<String>().unwrap().as_str())
            .collect();
        assert_eq!(names, vec!["third", "first", "second"]);
        assert_eq!(*order.lock().unwrap(), vec!["third", "first", "second"]);
    }

    #[tokio::test]
    async fn test_overwrite_discards_cached_singleton() {
        let container = container();
        container.register("vault", DependencySpec::module("vault"), false).unwrap();
        let before = container.resolve("vault").await.unwrap();

        container.register("vault", DependencySpec::module("vault"), true).unwrap();
        assert!(!container.is_singleton_cached("vault"));
        let after = container.resolve("vault").await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_register_configured_dependencies() {
        let container = container();
        let declared = crate::config::parse_config(
            r#"
            [dependencies.vault]
            module = "vault"
            lifespan = "SingleUse"

            [dependencies.greeting]
            module = "greeting"
            "#,
        )
        .unwrap()
        .dependencies;

        assert_eq!(container.register_configured(&declared).unwrap(), 2);
        let a = container.resolve("vault").await.unwrap();
        let b = container.resolve("vault").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*container.resolve_as::<String>("greeting").await.unwrap(), "hello");

        let err = container.register_configured(&declared).unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateKey(_)));
    }
}

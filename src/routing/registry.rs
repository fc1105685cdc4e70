//! Controller type registry.
//!
//! # Responsibilities
//! - Synthesize every controller type once, at boot
//! - Attach the view search path and a fresh view cache to each registration
//! - Reject duplicate controller names and routes bound twice across controllers
//! - Rebuild the whole table on reload
//!
//! # Design Decisions
//! - The table is swapped atomically (`ArcSwap`); in-flight requests keep the
//!   registration they started with
//! - Reloads are serialized and never merge into the live table
//! - Registrations keep the order the types were presented in

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::config::ViewConfig;
use crate::controller::{ConstructFn, ControllerType};
use crate::observability::metrics;
use crate::routing::meta::RegisterRoutesFn;
use crate::routing::synthesizer::{routes_overlap, synthesize, RouteDescriptor, SynthesisError};
use crate::routing::verb::HttpVerb;
use crate::views::{ViewCache, ViewResolver};

/// Everything known about one controller type at dispatch time.
pub struct ControllerTypeRegistration {
    pub name: String,
    pub type_name: String,
    /// Synthesized routes in registration order. Empty for custom routing.
    pub routes: Vec<RouteDescriptor>,
    pub constructor_dependency_names: Vec<String>,
    pub view_search_path: Vec<PathBuf>,
    pub view_cache: ViewCache,
    pub view_resolver: Arc<ViewResolver>,
    pub path_prefix: Option<String>,
    pub(crate) register_routes: Option<RegisterRoutesFn>,
    pub(crate) construct: ConstructFn,
}

impl ControllerTypeRegistration {
    /// Full path of a route as mounted, prefix included.
    pub fn mount_path(&self, route: &RouteDescriptor) -> String {
        mount_path(self.path_prefix.as_deref(), &route.path_pattern)
    }

    pub fn has_custom_routes(&self) -> bool {
        self.register_routes.is_some()
    }

    /// Route for a raw action name.
    pub fn route(&self, raw_action_name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.raw_action_name == raw_action_name)
    }
}

impl std::fmt::Debug for ControllerTypeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerTypeRegistration")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("routes", &self.routes.len())
            .field("constructor_dependency_names", &self.constructor_dependency_names)
            .field("view_search_path", &self.view_search_path)
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

/// `/api` + `/` → `/api`, `/api` + `/user/{p0}` → `/api/user/{p0}`.
pub fn mount_path(prefix: Option<&str>, pattern: &str) -> String {
    match prefix {
        Some(prefix) if pattern == "/" => prefix.to_string(),
        Some(prefix) => format!("{prefix}{pattern}"),
        None => pattern.to_string(),
    }
}

#[derive(Default)]
struct ControllerTable {
    order: Vec<Arc<ControllerTypeRegistration>>,
    by_name: HashMap<String, Arc<ControllerTypeRegistration>>,
}

/// All registered controller types, keyed by controller name.
pub struct ControllerRegistry {
    types: Vec<ControllerType>,
    table: ArcSwap<ControllerTable>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ControllerRegistry {
    /// Synthesize and register `types`. Any synthesis error is fatal.
    pub fn build(types: Vec<ControllerType>, views: &ViewConfig) -> Result<Self, SynthesisError> {
        let table = build_table(&types, views)?;
        tracing::info!(controllers = table.order.len(), "Controller registry built");
        Ok(Self {
            types,
            table: ArcSwap::from_pointee(table),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<ControllerTypeRegistration>> {
        self.table.load().by_name.get(name).cloned()
    }

    /// Registrations in the order their types were presented.
    pub fn registrations(&self) -> Vec<Arc<ControllerTypeRegistration>> {
        self.table.load().order.clone()
    }

    pub fn len(&self) -> usize {
        self.table.load().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of completed reloads.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuild every registration against `views`, then swap the table.
    ///
    /// View caches start empty. On error the live table is left untouched.
    pub async fn reload(&self, views: &ViewConfig) -> Result<u64, SynthesisError> {
        let _guard = self.reload_lock.lock().await;
        let table = build_table(&self.types, views)?;
        self.table.store(Arc::new(table));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::record_reload();
        tracing::info!(generation, "Controller registry reloaded");
        Ok(generation)
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

fn build_table(types: &[ControllerType], views: &ViewConfig) -> Result<ControllerTable, SynthesisError> {
    let resolver = Arc::new(ViewResolver::new(views.extensions.iter().cloned()));
    let mut table = ControllerTable::default();
    let mut mounted: Vec<(HttpVerb, String, String)> = Vec::new();

    for controller_type in types {
        let descriptor = controller_type.descriptor();
        let synthesized = synthesize(descriptor)?;

        if table.by_name.contains_key(&synthesized.name) {
            return Err(SynthesisError::DuplicateController(synthesized.name));
        }

        // Routes of one controller were checked against each other by synthesis.
        let own_mounts: Vec<(HttpVerb, String)> = synthesized
            .routes
            .iter()
            .map(|route| (route.verb, mount_path(synthesized.path_prefix.as_deref(), &route.path_pattern)))
            .collect();
        for (verb, path) in &own_mounts {
            if let Some((first_verb, first_path, first)) = mounted
                .iter()
                .find(|(v, p, _)| routes_overlap(*v, p, *verb, path))
            {
                return Err(SynthesisError::MountConflict {
                    first: first.clone(),
                    first_route: format!("{first_verb} {first_path}"),
                    second: synthesized.name,
                    second_route: format!("{verb} {path}"),
                });
            }
        }
        mounted.extend(
            own_mounts
                .into_iter()
                .map(|(verb, path)| (verb, path, synthesized.name.clone())),
        );

        let view_search_path = descriptor
            .view_paths
            .clone()
            .unwrap_or_else(|| views.search_path_for(&synthesized.name));

        tracing::debug!(
            controller = %synthesized.name,
            type_name = %descriptor.type_name,
            routes = synthesized.routes.len(),
            dependencies = ?synthesized.constructor_dependency_names,
            "Controller registered"
        );

        let registration = Arc::new(ControllerTypeRegistration {
            name: synthesized.name.clone(),
            type_name: descriptor.type_name.clone(),
            routes: synthesized.routes,
            constructor_dependency_names: synthesized.constructor_dependency_names,
            view_search_path,
            view_cache: ViewCache::new(),
            view_resolver: resolver.clone(),
            path_prefix: synthesized.path_prefix,
            register_routes: descriptor.register_routes.clone(),
            construct: controller_type.constructor(),
        });
        table.order.push(registration.clone());
        table.by_name.insert(synthesized.name, registration);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{
        ActionArgs, ActionError, Controller, ControllerSettings, ResolvedDependencies,
    };
    use crate::http::response::ActionResponse;
    use crate::routing::ControllerDescriptor;
    use futures_util::future::BoxFuture;

    macro_rules! test_controller {
        ($ty:ident, $descriptor:expr) => {
            struct $ty;

            impl Controller for $ty {
                fn descriptor() -> ControllerDescriptor {
                    $descriptor
                }

                fn construct(_: ControllerSettings, _: ResolvedDependencies) -> Result<Self, ActionError> {
                    Ok($ty)
                }

                fn invoke<'a>(
                    &'a self,
                    action: &'a str,
                    _: ActionArgs,
                ) -> BoxFuture<'a, Result<ActionResponse, ActionError>> {
                    Box::pin(async move { Ok(ActionResponse::text(action)) })
                }
            }
        };
    }

    test_controller!(
        UserController,
        ControllerDescriptor::new("UserController")
            .constructor(["settings", "vault"])
            .action("get", Vec::<String>::new())
            .action("getUser", ["name"])
    );
    test_controller!(
        ApiUserController,
        ControllerDescriptor::new("ApiUserController")
            .action("getUser", ["id"])
            .path_prefix("/api")
    );
    test_controller!(
        ThemedController,
        ControllerDescriptor::new("ThemedController")
            .action("get", Vec::<String>::new())
            .path_prefix("/themed")
            .view_paths(["/srv/themes/dark"])
    );
    test_controller!(
        ClashController,
        ControllerDescriptor::new("ClashController").action("getUser", ["other"])
    );

    test_controller!(
        RenameController,
        ControllerDescriptor::new("RenameController").method(
            crate::routing::MethodMeta::new("deleteUser")
                .params(["id"])
                .fixed_path("/user/{id}")
        )
    );

    #[test]
    fn test_build_keeps_type_order() {
        let registry = ControllerRegistry::build(
            vec![
                ControllerType::of::<UserController>(),
                ControllerType::of::<ApiUserController>(),
            ],
            &ViewConfig::default(),
        )
        .unwrap();

        let names: Vec<_> = registry.registrations().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["user", "api-user"]);

        let user = registry.get("user").unwrap();
        assert_eq!(user.constructor_dependency_names, vec!["vault"]);
        assert_eq!(
            user.view_search_path,
            vec![PathBuf::from("views/user"), PathBuf::from("views/shared")]
        );
        assert_eq!(user.mount_path(&user.routes[1]), "/user/{p0}");

        let api = registry.get("api-user").unwrap();
        assert_eq!(api.mount_path(&api.routes[0]), "/api/user/{p0}");
    }

    #[test]
    fn test_view_paths_override_configured_search_path() {
        let registry = ControllerRegistry::build(
            vec![ControllerType::of::<ThemedController>()],
            &ViewConfig::default(),
        )
        .unwrap();
        let themed = registry.get("themed").unwrap();
        assert_eq!(themed.view_search_path, vec![PathBuf::from("/srv/themes/dark")]);
        assert_eq!(themed.mount_path(&themed.routes[0]), "/themed");
    }

    #[test]
    fn test_duplicate_controller_rejected() {
        let err = ControllerRegistry::build(
            vec![ControllerType::of::<UserController>(), ControllerType::of::<UserController>()],
            &ViewConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, SynthesisError::DuplicateController("user".to_string()));
    }

    #[test]
    fn test_route_bound_by_two_controllers_rejected() {
        let err = ControllerRegistry::build(
            vec![ControllerType::of::<UserController>(), ControllerType::of::<ClashController>()],
            &ViewConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::MountConflict {
                first: "user".to_string(),
                first_route: "GET /user/{p0}".to_string(),
                second: "clash".to_string(),
                second_route: "GET /user/{p0}".to_string(),
            }
        );
    }

    #[test]
    fn test_placeholder_names_clash_across_controllers() {
        let err = ControllerRegistry::build(
            vec![ControllerType::of::<UserController>(), ControllerType::of::<RenameController>()],
            &ViewConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::MountConflict {
                first: "user".to_string(),
                first_route: "GET /user/{p0}".to_string(),
                second: "rename".to_string(),
                second_route: "DELETE /user/{id}".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reload_replaces_registrations() {
        let registry = ControllerRegistry::build(
            vec![ControllerType::of::<UserController>()],
            &ViewConfig::default(),
        )
        .unwrap();
        let before = registry.get("user").unwrap();

        let views = ViewConfig {
            root: PathBuf::from("templates"),
            ..ViewConfig::default()
        };
        assert_eq!(registry.reload(&views).await.unwrap(), 1);

        let after = registry.get("user").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.view_search_path[0], PathBuf::from("templates/user"));
        assert_eq!(before.view_search_path[0], PathBuf::from("views/user"));
        assert_eq!(registry.generation(), 1);
    }
}

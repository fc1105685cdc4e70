//! Controllers and dependencies served by the binary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::json;

use controller_dispatch::container::{BoxError, ContainerError};
use controller_dispatch::http::{action, ActionTarget};
use controller_dispatch::routing::HttpVerb;
use controller_dispatch::{
    ActionArgs, ActionError, ActionResponse, AppContext, Controller, ControllerDescriptor,
    ControllerSettings, ControllerType, DependencyContainer, DependencySpec, ResolvedDependencies,
    StaticModules,
};

/// Greets by name, signed with the application name.
pub struct Greeter {
    app_name: String,
}

impl Greeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}! ({})", self.app_name)
    }
}

/// Counts requests that touched it.
#[derive(Default)]
pub struct VisitCounter(AtomicU64);

impl VisitCounter {
    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Modules config files may reference.
pub fn modules() -> StaticModules {
    StaticModules::new().constructible("greeter", |app: &AppContext, _args: &[serde_json::Value]| {
        Ok::<_, BoxError>(Greeter {
            app_name: app.name(),
        })
    })
}

/// Dependencies registered in code. Config entries may replace them.
pub fn register_dependencies(container: &DependencyContainer) -> Result<(), ContainerError> {
    container.register("greeter", DependencySpec::module("greeter"), false)?;
    container.register(
        "visits",
        DependencySpec::builder(|_| async { Ok::<_, BoxError>(VisitCounter::default()) }),
        false,
    )?;
    Ok(())
}

pub fn controller_types() -> Vec<ControllerType> {
    vec![
        ControllerType::of::<HomeController>(),
        ControllerType::of::<UserController>(),
        ControllerType::of::<HealthController>(),
    ]
}

/// `GET /` serves the `index` view, `GET /hello/{name}` greets.
pub struct HomeController {
    settings: ControllerSettings,
    greeter: Arc<Greeter>,
}

impl Controller for HomeController {
    fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor::new("HomeController")
            .constructor(["settings", "greeter"])
            .action("get", Vec::<String>::new())
            .action("getHello", ["name"])
    }

    fn construct(settings: ControllerSettings, deps: ResolvedDependencies) -> Result<Self, ActionError> {
        Ok(Self {
            settings,
            greeter: deps.get(0)?,
        })
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ActionArgs,
    ) -> BoxFuture<'a, Result<ActionResponse, ActionError>> {
        Box::pin(async move {
            match action {
                "get" => self.settings.view(None, serde_json::Value::Null).await,
                "getHello" => Ok(ActionResponse::text(self.greeter.greet(args.require("name")?))),
                other => Err(ActionError::UnknownAction(other.to_string())),
            }
        })
    }
}

/// User endpoints under `/users`.
pub struct UserController {
    visits: Arc<VisitCounter>,
}

impl Controller for UserController {
    fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor::new("UserController")
            .constructor(["settings", "visits"])
            .action("get", Vec::<String>::new())
            .action("getUser", ["name"])
            .action("postUser", ["name", "role = \"member\""])
            .path_prefix("/users")
    }

    fn construct(_settings: ControllerSettings, deps: ResolvedDependencies) -> Result<Self, ActionError> {
        Ok(Self {
            visits: deps.by_name("visits")?,
        })
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ActionArgs,
    ) -> BoxFuture<'a, Result<ActionResponse, ActionError>> {
        Box::pin(async move {
            let visits = self.visits.bump();
            match action {
                "get" => Ok(ActionResponse::Json(json!({ "users": [], "visits": visits }))),
                "getUser" => Ok(ActionResponse::Json(json!({
                    "name": args.require("name")?,
                    "visits": visits,
                }))),
                "postUser" => Ok(ActionResponse::Json(json!({
                    "name": args.require("name")?,
                    "role": args.get("role").unwrap_or("member"),
                }))),
                other => Err(ActionError::UnknownAction(other.to_string())),
            }
        })
    }
}

/// Liveness probe bound by its own routine.
pub struct HealthController;

impl Controller for HealthController {
    fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor::new("HealthController")
            .constructor(["settings"])
            .action("getPing", Vec::<String>::new())
            .register_routes(|router| {
                router.route("/health", action(HttpVerb::Get, ActionTarget::new("health", "getPing")))
            })
    }

    fn construct(_: ControllerSettings, _: ResolvedDependencies) -> Result<Self, ActionError> {
        Ok(HealthController)
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        _args: ActionArgs,
    ) -> BoxFuture<'a, Result<ActionResponse, ActionError>> {
        Box::pin(async move {
            match action {
                "getPing" => Ok(ActionResponse::text("ok")),
                other => Err(ActionError::UnknownAction(other.to_string())),
            }
        })
    }
}

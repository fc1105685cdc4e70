//! Request dispatch: from a matched route to an action response.
//!
//! # Responsibilities
//! - Bind every registered route on an axum router, in registration order
//! - Map path captures to action parameter names, fall back to the body
//! - Construct a controller per request and invoke the action
//! - Hand every failure to the single `ErrorHandler`
//!
//! # Data Flow
//! ```text
//! axum route (verb, mount path)
//!     → captures + decoded body (JSON object or form)
//!     → ControllerFactory::create (dependencies, settings)
//!     → Controller::invoke (raw action name, bound args)
//!     → ActionResponse → HTTP response
//!     ↘ any error or panic → ErrorHandler
//! ```
//!
//! # Design Decisions
//! - Synthesized routes are mounted at their full path; only custom
//!   registration routines are nested under the prefix
//! - A panicking action is caught and reported as a dispatch error

use std::collections::HashMap;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{Form, FromRequest, RawPathParams, Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{on, MethodRouter};
use axum::{Json, Router};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::app::AppContext;
use crate::container::DependencyContainer;
use crate::controller::{ActionArgs, ActionContext, ControllerFactory, RequestContext};
use crate::http::error::{DefaultErrorHandler, DispatchError, ErrorHandler};
use crate::http::response::{PlaceholderRenderer, TemplateRenderer};
use crate::observability::metrics;
use crate::routing::meta::kebab_case;
use crate::routing::synthesizer::INDEX;
use crate::routing::{
    mount_path, placeholders, ControllerRegistry, ControllerTypeRegistration, HttpVerb, RouteDescriptor,
    SynthesisError,
};

/// Request id header set by the transport.
pub const X_REQUEST_ID: &str = "x-request-id";

/// State shared by every action handler.
#[derive(Clone)]
pub struct DispatchState {
    app: AppContext,
    factory: ControllerFactory,
    error_handler: Arc<dyn ErrorHandler>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl DispatchState {
    pub fn app(&self) -> &AppContext {
        &self.app
    }

    pub fn factory(&self) -> &ControllerFactory {
        &self.factory
    }
}

/// Where a route leads: controller, action and how its parameters bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTarget {
    controller: String,
    raw_action: String,
    action: String,
    default_view: String,
    /// Placeholder names of the path pattern, in order.
    placeholders: Vec<String>,
    /// Parameter bound to each placeholder.
    parameter_names: Vec<String>,
    action_parameters: Vec<String>,
}

impl ActionTarget {
    /// Target for a custom route. Path captures bind by their own names.
    pub fn new(controller: impl Into<String>, raw_action: impl Into<String>) -> Self {
        let raw_action = raw_action.into();
        let segment = match HttpVerb::split_prefix(&raw_action) {
            Some((_, rest)) => kebab_case(rest),
            None => kebab_case(&raw_action),
        };
        let action = if segment.is_empty() { INDEX.to_string() } else { segment };
        Self {
            controller: controller.into(),
            default_view: action.clone(),
            action,
            raw_action,
            placeholders: Vec::new(),
            parameter_names: Vec::new(),
            action_parameters: Vec::new(),
        }
    }

    /// Declare the action's parameters, in order.
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_parameters = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = view.into();
        self
    }

    /// Target of a synthesized route.
    pub fn from_route(controller: &str, route: &RouteDescriptor) -> Self {
        Self {
            controller: controller.to_string(),
            raw_action: route.raw_action_name.clone(),
            action: route.action.clone(),
            default_view: route.default_view_name.clone(),
            placeholders: placeholders(&route.path_pattern),
            parameter_names: route.parameter_names.clone(),
            action_parameters: route.action_parameters.clone(),
        }
    }

    fn action_context(&self) -> ActionContext {
        ActionContext {
            controller: self.controller.clone(),
            raw_action: self.raw_action.clone(),
            action: self.action.clone(),
            default_view: self.default_view.clone(),
        }
    }

    /// Key each capture by the parameter its placeholder stands for.
    fn bind_captures<'a, I>(&self, captures: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        captures
            .into_iter()
            .map(|(key, value)| {
                let name = self
                    .placeholders
                    .iter()
                    .position(|p| p == key)
                    .and_then(|i| self.parameter_names.get(i))
                    .map_or_else(|| key.to_string(), Clone::clone);
                (name, value.to_string())
            })
            .collect()
    }
}

/// Method router dispatching `verb` to `target`.
///
/// Custom registration routines use this to bind their own paths.
pub fn action(verb: HttpVerb, target: ActionTarget) -> MethodRouter<DispatchState> {
    let target = Arc::new(target);
    on(
        verb.method_filter(),
        move |State(state): State<DispatchState>,
              captures: Result<RawPathParams, RawPathParamsRejection>,
              request: Request| {
            let target = target.clone();
            async move { dispatch(state, target, captures, request).await }
        },
    )
}

/// Builds the axum router over every registered controller.
pub struct RequestDispatcher {
    registry: Arc<ControllerRegistry>,
    state: DispatchState,
}

impl RequestDispatcher {
    pub fn new(app: AppContext, registry: Arc<ControllerRegistry>, container: DependencyContainer) -> Self {
        let factory = ControllerFactory::new(registry.clone(), container);
        Self {
            registry,
            state: DispatchState {
                app,
                factory,
                error_handler: Arc::new(DefaultErrorHandler),
                renderer: Arc::new(PlaceholderRenderer),
            },
        }
    }

    /// Replace the centralized error handler.
    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.state.error_handler = Arc::new(handler);
        self
    }

    /// Replace the template renderer.
    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.state.renderer = Arc::new(renderer);
        self
    }

    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// Router over the registry's current registrations.
    ///
    /// Synthesized routes were checked for overlap when the registry was
    /// built. Custom registration routines are opaque until they run, so a
    /// route the router refuses to insert fails here, naming the controller
    /// whose routes were being bound.
    pub fn router(&self) -> Result<Router, SynthesisError> {
        let mut router: Router<DispatchState> = Router::new();

        for registration in self.registry.registrations() {
            router = panic::catch_unwind(AssertUnwindSafe(|| bind_routes(router, &registration)))
                .map_err(|payload| SynthesisError::RouterRejected {
                    controller: registration.name.clone(),
                    reason: panic_message(payload.as_ref()),
                })?;
        }

        Ok(router.with_state(self.state.clone()))
    }
}

fn bind_routes(router: Router<DispatchState>, registration: &ControllerTypeRegistration) -> Router<DispatchState> {
    if let Some(routine) = &registration.register_routes {
        let custom = routine(Router::new());
        tracing::debug!(controller = %registration.name, "Custom routes bound");
        return match &registration.path_prefix {
            Some(prefix) => router.nest(prefix, custom),
            None => router.merge(custom),
        };
    }

    registration.routes.iter().fold(router, |router, route| {
        let path = mount_path(registration.path_prefix.as_deref(), &route.path_pattern);
        tracing::debug!(
            controller = %registration.name,
            verb = %route.verb,
            path = %path,
            action = %route.raw_action_name,
            ranking = route.ranking,
            "Route bound"
        );
        let target = ActionTarget::from_route(&registration.name, route);
        router.route(&path, action(route.verb, target))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "route registration panicked".to_string())
}

async fn dispatch(
    state: DispatchState,
    target: Arc<ActionTarget>,
    captures: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let mut ctx = RequestContext {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        request_id: request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
            .into(),
        ..RequestContext::default()
    };

    let captures = match captures {
        Ok(captures) => Ok(target.bind_captures(&captures)),
        Err(RawPathParamsRejection::InvalidUtf8InPathParam(e)) => {
            Err(DispatchError::BadRequest(e.body_text()))
        }
        Err(_) => Ok(HashMap::new()),
    };

    let outcome = match (captures, read_body(request, &state).await) {
        (Ok(params), Ok(body)) => {
            ctx.params = params;
            ctx.body = body;
            AssertUnwindSafe(run(&state, &target, &ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(DispatchError::Panicked {
                        controller: target.controller.clone(),
                        action: target.raw_action.clone(),
                    })
                })
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    let response = match outcome {
        Ok(response) => response,
        Err(error) => state.error_handler.handle(error, &ctx),
    };

    tracing::debug!(
        request_id = ctx.request_id.as_deref().unwrap_or_default(),
        controller = %target.controller,
        action = %target.raw_action,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request dispatched"
    );
    metrics::record_request(&target.controller, &target.raw_action, response.status().as_u16(), start);
    response
}

async fn run(state: &DispatchState, target: &ActionTarget, ctx: &RequestContext) -> Result<Response, DispatchError> {
    let instance = state
        .factory
        .create(&state.app, &target.controller, target.action_context(), ctx.clone())
        .await?;

    let args = ActionArgs::bind(&target.action_parameters, &ctx.params, &ctx.body);
    let response = instance
        .invoke(&target.raw_action, args)
        .await
        .map_err(|source| DispatchError::Action {
            controller: target.controller.clone(),
            action: target.raw_action.clone(),
            source,
        })?;

    Ok(response.into_http(state.renderer.as_ref()).await?)
}

/// Decode a JSON object or form body. Anything else yields no fields.
async fn read_body(request: Request, state: &DispatchState) -> Result<Map<String, Value>, DispatchError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(value) = Json::<Value>::from_request(request, state)
            .await
            .map_err(|e| DispatchError::BadRequest(e.body_text()))?;
        Ok(match value {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
            .await
            .map_err(|e| DispatchError::BadRequest(e.body_text()))?;
        Ok(fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    } else {
        Ok(Map::new())
    }
}

//! Admin endpoints: route table and status, behind a bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::app::AppContext;
use crate::routing::ControllerRegistry;

#[derive(Clone)]
pub struct AdminState {
    pub app: AppContext,
    pub registry: Arc<ControllerRegistry>,
}

pub fn admin_router(app: AppContext, registry: Arc<ControllerRegistry>) -> Router {
    let state = AdminState { app, registry };
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

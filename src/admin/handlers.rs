use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::routing::HttpVerb;

#[derive(Serialize)]
pub struct SystemStatus {
    pub name: String,
    pub version: &'static str,
    pub controllers: usize,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct ControllerRoutes {
    pub controller: String,
    pub type_name: String,
    pub path_prefix: Option<String>,
    pub custom_routes: bool,
    pub dependencies: Vec<String>,
    pub view_search_path: Vec<String>,
    pub routes: Vec<RouteEntry>,
}

#[derive(Serialize)]
pub struct RouteEntry {
    pub verb: HttpVerb,
    pub path: String,
    pub action: String,
    pub parameters: Vec<String>,
    pub ranking: usize,
    pub default_view: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        name: state.app.name(),
        version: env!("CARGO_PKG_VERSION"),
        controllers: state.registry.len(),
        generation: state.registry.generation(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<ControllerRoutes>> {
    let controllers = state
        .registry
        .registrations()
        .iter()
        .map(|registration| ControllerRoutes {
            controller: registration.name.clone(),
            type_name: registration.type_name.clone(),
            path_prefix: registration.path_prefix.clone(),
            custom_routes: registration.has_custom_routes(),
            dependencies: registration.constructor_dependency_names.clone(),
            view_search_path: registration
                .view_search_path
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            routes: registration
                .routes
                .iter()
                .map(|route| RouteEntry {
                    verb: route.verb,
                    path: registration.mount_path(route),
                    action: route.raw_action_name.clone(),
                    parameters: route.parameter_names.clone(),
                    ranking: route.ranking,
                    default_view: route.default_view_name.clone(),
                })
                .collect(),
        })
        .collect();

    Json(controllers)
}

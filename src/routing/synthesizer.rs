//! Route synthesis from controller method metadata.
//!
//! # Responsibilities
//! - Recognise action methods by their leading verb token
//! - Capture constructor dependency names
//! - Build path patterns with one positional placeholder per parameter
//! - Order routes so the least ambiguous are registered first
//!
//! # Design Decisions
//! - Ranking is the placeholder count; fewer placeholders rank first
//! - Ties break on the raw method name, lexically
//! - Placeholders are positional (`{p0}`, `{p1}`) so two verbs sharing a
//!   path never disagree on placeholder names
//! - Overlap is judged on the path shape with placeholder names erased: the
//!   router refuses two patterns of one shape that name their captures
//!   differently, whatever their verbs
//! - A controller with its own registration routine is not scanned for routes

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::routing::meta::{kebab_case, ControllerDescriptor, MethodMeta};
use crate::routing::verb::HttpVerb;

/// Action segment and default view of a bare verb method (`get()`).
pub const INDEX: &str = "index";

/// Errors that make a controller type unusable. Fatal at boot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("controller type `{0}` yields an empty controller name")]
    EmptyName(String),

    #[error("controller `{0}` is registered twice")]
    DuplicateController(String),

    #[error("controller `{controller}` declares method `{method}` twice")]
    DuplicateMethod { controller: String, method: String },

    #[error("constructor of `{0}` must take the settings parameter first")]
    MissingSettingsParameter(String),

    #[error("controller `{controller}`: {second_route} of `{second}` overlaps {first_route} of `{first}`")]
    RouteConflict {
        controller: String,
        first: String,
        first_route: String,
        second: String,
        second_route: String,
    },

    #[error("{second_route} of controller `{second}` overlaps {first_route} of controller `{first}`")]
    MountConflict {
        first: String,
        first_route: String,
        second: String,
        second_route: String,
    },

    #[error("routes of controller `{controller}` rejected by the router: {reason}")]
    RouterRejected { controller: String, reason: String },

    #[error("controller `{controller}`: path `{path}` of `{method}` names unknown parameter `{param}`")]
    UnknownPathParameter {
        controller: String,
        method: String,
        path: String,
        param: String,
    },

    #[error("controller `{controller}`: invalid path prefix `{prefix}`")]
    InvalidPrefix { controller: String, prefix: String },
}

/// One synthesized route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    pub verb: HttpVerb,
    /// Method name as declared, e.g. `getUser`.
    pub raw_action_name: String,
    /// Action segment, e.g. `user`, `index` for a bare verb.
    pub action: String,
    /// Path relative to the controller mount point.
    pub path_pattern: String,
    /// Action parameters bound to the pattern's placeholders, in order.
    pub parameter_names: Vec<String>,
    /// Every action parameter, in declaration order.
    pub action_parameters: Vec<String>,
    pub ranking: usize,
    pub default_view_name: String,
}

/// Output of scanning one controller type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedController {
    pub name: String,
    /// Sorted by (ranking, raw action name). Empty for custom registration.
    pub routes: Vec<RouteDescriptor>,
    /// Constructor parameters after the settings parameter.
    pub constructor_dependency_names: Vec<String>,
    pub path_prefix: Option<String>,
    pub custom_routes: bool,
}

/// Scan a controller description.
pub fn synthesize(descriptor: &ControllerDescriptor) -> Result<SynthesizedController, SynthesisError> {
    let name = descriptor.controller_name();
    if name.is_empty() {
        return Err(SynthesisError::EmptyName(descriptor.type_name.clone()));
    }

    let mut seen = HashSet::new();
    for method in &descriptor.methods {
        if !seen.insert(method.name.as_str()) {
            return Err(SynthesisError::DuplicateMethod {
                controller: name,
                method: method.name.clone(),
            });
        }
    }

    let constructor_dependency_names = match descriptor.methods.iter().find(|m| m.is_constructor()) {
        Some(constructor) => {
            let params = constructor.param_names();
            if params.is_empty() {
                return Err(SynthesisError::MissingSettingsParameter(name));
            }
            params[1..].to_vec()
        }
        None => Vec::new(),
    };

    let path_prefix = match &descriptor.path_prefix {
        Some(prefix) => Some(normalize_prefix(prefix).ok_or_else(|| SynthesisError::InvalidPrefix {
            controller: name.clone(),
            prefix: prefix.clone(),
        })?),
        None => None,
    };

    if descriptor.register_routes.is_some() {
        tracing::debug!(controller = %name, "Custom route registration, skipping convention scan");
        return Ok(SynthesizedController {
            name,
            routes: Vec::new(),
            constructor_dependency_names,
            path_prefix,
            custom_routes: true,
        });
    }

    let mut routes = Vec::new();
    for method in &descriptor.methods {
        if method.is_constructor() {
            continue;
        }
        let Some((verb, remainder)) = HttpVerb::split_prefix(&method.name) else {
            tracing::trace!(controller = %name, method = %method.name, "Not routable");
            continue;
        };
        routes.push(route_for(&name, method, verb, remainder)?);
    }

    routes.sort_by(|a, b| {
        a.ranking
            .cmp(&b.ranking)
            .then_with(|| a.raw_action_name.cmp(&b.raw_action_name))
    });

    for (i, route) in routes.iter().enumerate() {
        if let Some(other) = routes[..i]
            .iter()
            .find(|r| routes_overlap(r.verb, &r.path_pattern, route.verb, &route.path_pattern))
        {
            return Err(SynthesisError::RouteConflict {
                controller: name,
                first: other.raw_action_name.clone(),
                first_route: format!("{} {}", other.verb, other.path_pattern),
                second: route.raw_action_name.clone(),
                second_route: format!("{} {}", route.verb, route.path_pattern),
            });
        }
    }

    tracing::debug!(controller = %name, routes = routes.len(), "Routes synthesized");

    Ok(SynthesizedController {
        name,
        routes,
        constructor_dependency_names,
        path_prefix,
        custom_routes: false,
    })
}

fn route_for(
    controller: &str,
    method: &MethodMeta,
    verb: HttpVerb,
    remainder: &str,
) -> Result<RouteDescriptor, SynthesisError> {
    let segment = kebab_case(remainder);
    let action = if segment.is_empty() { INDEX.to_string() } else { segment.clone() };
    let action_parameters = method.param_names();

    let (path_pattern, parameter_names) = match &method.fixed_path {
        Some(fixed) => {
            let path = normalize_path(fixed);
            let placeholders = placeholders(&path);
            if let Some(unknown) = placeholders.iter().find(|p| !action_parameters.contains(p)) {
                return Err(SynthesisError::UnknownPathParameter {
                    controller: controller.to_string(),
                    method: method.name.clone(),
                    path,
                    param: unknown.clone(),
                });
            }
            (path, placeholders)
        }
        None => {
            let mut path = String::new();
            if !segment.is_empty() {
                path.push('/');
                path.push_str(&segment);
            }
            for i in 0..action_parameters.len() {
                path.push_str(&format!("/{{p{i}}}"));
            }
            if path.is_empty() {
                path.push('/');
            }
            (path, action_parameters.clone())
        }
    };

    Ok(RouteDescriptor {
        verb,
        raw_action_name: method.name.clone(),
        default_view_name: method.default_view.clone().unwrap_or_else(|| action.clone()),
        action,
        ranking: parameter_names.len(),
        path_pattern,
        parameter_names,
        action_parameters,
    })
}

/// Placeholder names of a path pattern, in order.
pub fn placeholders(pattern: &str) -> Vec<String> {
    pattern
        .split('/')
        .filter_map(|part| part.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*').to_string())
        .collect()
}

/// Pattern with placeholder names erased: `/user/{name}` → `/user/{}`,
/// catch-alls become `{*}`. Escaped braces (`{{`, `}}`) are kept.
pub fn route_shape(pattern: &str) -> String {
    let mut shape = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                shape.push_str("{{");
            }
            '{' => {
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                shape.push_str(if name.starts_with('*') { "{*}" } else { "{}" });
            }
            _ => shape.push(c),
        }
    }
    shape
}

/// Whether two routes cannot be bound on the same router.
///
/// Same shape and same verb is a double binding. Same shape under different
/// placeholder names is refused by the router even across verbs.
pub fn routes_overlap(verb_a: HttpVerb, path_a: &str, verb_b: HttpVerb, path_b: &str) -> bool {
    route_shape(path_a) == route_shape(path_b) && (verb_a == verb_b || path_a != path_b)
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Prefixes are literal: no placeholders, never the bare root.
fn normalize_prefix(prefix: &str) -> Option<String> {
    let path = normalize_path(prefix);
    if path == "/" || path.contains('{') || path.contains('}') {
        None
    } else {
        Some(path)
    }
}

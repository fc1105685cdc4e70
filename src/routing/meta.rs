//! Declared method metadata of controller types.
//!
//! Controllers describe themselves as data: the method names they define and
//! the formal parameter names of each, in declaration order. The synthesizer
//! scans this description; nothing is parsed from source text.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;

use crate::http::DispatchState;

/// Name under which the constructor appears in a method list.
pub const CONSTRUCTOR: &str = "constructor";

/// Custom route registration routine of a controller.
///
/// Receives the controller's router and returns it with routes added.
pub type RegisterRoutesFn =
    Arc<dyn Fn(Router<DispatchState>) -> Router<DispatchState> + Send + Sync>;

/// One method declared directly on a controller type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    /// Method name, e.g. `getUser` or `get_user`.
    pub name: String,
    /// Formal parameters in declaration order. May carry defaults (`page = 1`).
    pub params: Vec<String>,
    /// Fixed URL path replacing the synthesized one.
    pub fixed_path: Option<String>,
    /// View rendered by default from this action.
    pub default_view: Option<String>,
}

impl MethodMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            fixed_path: None,
            default_view: None,
        }
    }

    /// The constructor, with its parameters (settings first).
    pub fn constructor<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CONSTRUCTOR).params(params)
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn fixed_path(mut self, path: impl Into<String>) -> Self {
        self.fixed_path = Some(path.into());
        self
    }

    pub fn default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = Some(view.into());
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    /// Parameter names with default values stripped.
    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| strip_default(p)).collect()
    }
}

/// `"page = 1"` → `"page"`.
pub fn strip_default(param: &str) -> String {
    param
        .split_once('=')
        .map_or(param, |(name, _)| name)
        .trim()
        .to_string()
}

/// Everything a controller type declares about itself.
#[derive(Clone)]
pub struct ControllerDescriptor {
    /// Rust type name, e.g. `UserController`.
    pub type_name: String,
    /// Methods defined directly on the type.
    pub methods: Vec<MethodMeta>,
    /// Mount point of the controller's routes.
    pub path_prefix: Option<String>,
    /// View directories overriding the configured search path.
    pub view_paths: Option<Vec<PathBuf>>,
    /// Replaces convention scanning when set.
    pub register_routes: Option<RegisterRoutesFn>,
}

impl ControllerDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: Vec::new(),
            path_prefix: None,
            view_paths: None,
            register_routes: None,
        }
    }

    /// Declare the constructor parameters, settings first.
    pub fn constructor<I, S>(self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.method(MethodMeta::constructor(params))
    }

    /// Declare a method with its parameters.
    pub fn action<I, S>(self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.method(MethodMeta::new(name).params(params))
    }

    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn view_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.view_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn register_routes<F>(mut self, routine: F) -> Self
    where
        F: Fn(Router<DispatchState>) -> Router<DispatchState> + Send + Sync + 'static,
    {
        self.register_routes = Some(Arc::new(routine));
        self
    }

    /// Controller name derived from the type name.
    pub fn controller_name(&self) -> String {
        controller_name_of(&self.type_name)
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods)
            .field("path_prefix", &self.path_prefix)
            .field("view_paths", &self.view_paths)
            .field("register_routes", &self.register_routes.is_some())
            .finish()
    }
}

/// `UserProfileController` → `user-profile`.
///
/// Module paths (`crate::web::UserController`) are reduced to the last segment.
pub fn controller_name_of(type_name: &str) -> String {
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    let base = short.strip_suffix("Controller").unwrap_or(short);
    kebab_case(base)
}

/// Split on `_`, `-` and lower→upper case changes, lowercase, join with `-`.
pub fn kebab_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("-")
}

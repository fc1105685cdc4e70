//! Per-request settings handed to a controller constructor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};

use crate::app::AppContext;
use crate::controller::error::ActionError;
use crate::http::response::ActionResponse;
use crate::routing::ControllerTypeRegistration;
use crate::views::{ViewCache, ViewError, ViewLookup, ViewScope};

/// The request a controller instance serves.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub request_id: Option<String>,
    /// Path captures keyed by action parameter name.
    pub params: HashMap<String, String>,
    /// Decoded request body, empty when absent or not an object.
    pub body: Map<String, Value>,
}

/// The action the instance was created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    pub controller: String,
    /// Declared method name, e.g. `getUser`.
    pub raw_action: String,
    /// Action segment, e.g. `user`.
    pub action: String,
    pub default_view: String,
}

/// Settings object: first constructor argument of every controller.
#[derive(Clone)]
pub struct ControllerSettings {
    app: AppContext,
    request: RequestContext,
    action: ActionContext,
    registration: Arc<ControllerTypeRegistration>,
}

impl ControllerSettings {
    pub(crate) fn new(
        app: AppContext,
        request: RequestContext,
        action: ActionContext,
        registration: Arc<ControllerTypeRegistration>,
    ) -> Self {
        Self {
            app,
            request,
            action,
            registration,
        }
    }

    pub fn app(&self) -> &AppContext {
        &self.app
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn action(&self) -> &ActionContext {
        &self.action
    }

    /// View directories of the controller, highest priority first.
    pub fn view_search_path(&self) -> &[PathBuf] {
        &self.registration.view_search_path
    }

    /// The controller's view lookup cache, shared by all its instances.
    pub fn view_cache(&self) -> &ViewCache {
        &self.registration.view_cache
    }

    /// Locate a view of this controller; `None` picks the action's default view.
    pub async fn locate_view(
        &self,
        view_name: Option<&str>,
        extension: Option<&str>,
        throw_if_missing: bool,
    ) -> Result<Arc<ViewLookup>, ViewError> {
        let scope = ViewScope {
            search_path: self.view_search_path(),
            cache: self.view_cache(),
            default_view: Some(&self.action.default_view),
        };
        self.registration
            .view_resolver
            .locate(scope, view_name, extension, throw_if_missing)
            .await
    }

    /// Respond with a view. `.html` files are sent as-is and `model` is
    /// ignored; anything else goes through the template renderer with `model`.
    pub async fn view(&self, view_name: Option<&str>, model: Value) -> Result<ActionResponse, ActionError> {
        let lookup = self.locate_view(view_name, None, true).await?;
        let file = lookup.file.clone().ok_or_else(|| ViewError::NotFound {
            view: view_name.unwrap_or(self.action.default_view.as_str()).to_string(),
            candidates: lookup.candidates.clone(),
        })?;
        Ok(if is_static(&file) {
            ActionResponse::File(file)
        } else {
            ActionResponse::Render { template: file, model }
        })
    }
}

fn is_static(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}

impl std::fmt::Debug for ControllerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSettings")
            .field("controller", &self.registration.name)
            .field("action", &self.action.raw_action)
            .field("path", &self.request.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::controller::{ActionArgs, Controller, ControllerType, ResolvedDependencies};
    use crate::routing::{ControllerDescriptor, ControllerRegistry};
    use futures_util::future::BoxFuture;

    struct PageController;

    impl Controller for PageController {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("PageController").action("getAbout", Vec::<String>::new())
        }

        fn construct(_: ControllerSettings, _: ResolvedDependencies) -> Result<Self, ActionError> {
            Ok(PageController)
        }

        fn invoke<'a>(
            &'a self,
            action: &'a str,
            _: ActionArgs,
        ) -> BoxFuture<'a, Result<ActionResponse, ActionError>> {
            Box::pin(async move { Err(ActionError::UnknownAction(action.to_string())) })
        }
    }

    fn settings(root: &Path) -> ControllerSettings {
        let views = ViewConfig {
            root: root.to_path_buf(),
            extensions: vec![".html".to_string(), ".tpl".to_string()],
            ..ViewConfig::default()
        };
        let registry = ControllerRegistry::build(vec![ControllerType::of::<PageController>()], &views).unwrap();
        let action = ActionContext {
            controller: "page".to_string(),
            raw_action: "getAbout".to_string(),
            action: "about".to_string(),
            default_view: "about".to_string(),
        };
        ControllerSettings::new(
            AppContext::default(),
            RequestContext::default(),
            action,
            registry.get("page").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_default_view_comes_from_action() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("shared")).unwrap();
        std::fs::write(root.path().join("shared/about.html"), "about").unwrap();
        let settings = settings(root.path());

        let lookup = settings.locate_view(None, None, true).await.unwrap();
        assert_eq!(lookup.file, Some(root.path().join("shared/about.html")));
        assert_eq!(settings.view_cache().len(), 1);

        let response = settings.view(None, Value::Null).await.unwrap();
        assert_eq!(response, ActionResponse::File(root.path().join("shared/about.html")));

        let model = serde_json::json!({"title": "x"});
        let response = settings.view(None, model).await.unwrap();
        assert_eq!(response, ActionResponse::File(root.path().join("shared/about.html")));
    }

    #[tokio::test]
    async fn test_templates_are_rendered() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("page")).unwrap();
        std::fs::write(root.path().join("page/card.tpl"), "{{ title }}").unwrap();
        let settings = settings(root.path());

        let model = serde_json::json!({"title": "hi"});
        let response = settings.view(Some("card"), model.clone()).await.unwrap();
        assert_eq!(
            response,
            ActionResponse::Render {
                template: root.path().join("page/card.tpl"),
                model,
            }
        );

        let err = settings.view(Some("missing"), Value::Null).await.unwrap_err();
        assert!(matches!(err, ActionError::View(ViewError::NotFound { ref candidates, .. }) if candidates.len() == 4));
    }
}

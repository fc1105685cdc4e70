//! Per-request controller construction.
//!
//! # Responsibilities
//! - Look up the registration of the matched controller
//! - Resolve its constructor dependencies, in declared order
//! - Build the settings object and construct the instance
//!
//! # Design Decisions
//! - Dependencies are resolved one after the other, never in parallel
//! - Any resolution failure aborts construction; nothing partial is returned

use std::sync::Arc;

use thiserror::Error;

use crate::app::AppContext;
use crate::container::{ContainerError, DependencyContainer};
use crate::controller::args::{ActionArgs, ResolvedDependencies};
use crate::controller::error::ActionError;
use crate::controller::settings::{ActionContext, ControllerSettings, RequestContext};
use crate::controller::Controller;
use crate::http::response::ActionResponse;
use crate::routing::{ControllerRegistry, ControllerTypeRegistration};

/// Errors raised while creating a controller instance.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("no controller registered as `{0}`")]
    ControllerNotFound(String),

    #[error("failed to resolve dependencies of controller `{controller}`")]
    Dependencies {
        controller: String,
        #[source]
        source: ContainerError,
    },

    #[error("constructor of controller `{controller}` failed")]
    Construction {
        controller: String,
        #[source]
        source: ActionError,
    },
}

/// A constructed controller, bound to one request.
pub struct ControllerInstance {
    controller: Box<dyn Controller>,
    registration: Arc<ControllerTypeRegistration>,
}

impl ControllerInstance {
    pub fn registration(&self) -> &ControllerTypeRegistration {
        &self.registration
    }

    /// Run `action` (raw method name) with `args`.
    pub async fn invoke(&self, action: &str, args: ActionArgs) -> Result<ActionResponse, ActionError> {
        self.controller.invoke(action, args).await
    }
}

impl std::fmt::Debug for ControllerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("controller", &self.registration.name)
            .finish()
    }
}

/// Creates controller instances from registrations and the container.
#[derive(Clone)]
pub struct ControllerFactory {
    registry: Arc<ControllerRegistry>,
    container: DependencyContainer,
}

impl ControllerFactory {
    pub fn new(registry: Arc<ControllerRegistry>, container: DependencyContainer) -> Self {
        Self { registry, container }
    }

    pub fn container(&self) -> &DependencyContainer {
        &self.container
    }

    /// Create an instance of `controller` for one request.
    pub async fn create(
        &self,
        app: &AppContext,
        controller: &str,
        action: ActionContext,
        request: RequestContext,
    ) -> Result<ControllerInstance, FactoryError> {
        let registration = self
            .registry
            .get(controller)
            .ok_or_else(|| FactoryError::ControllerNotFound(controller.to_string()))?;

        let names = &registration.constructor_dependency_names;
        let instances = self
            .container
            .resolve_many(names)
            .await
            .map_err(|source| FactoryError::Dependencies {
                controller: controller.to_string(),
                source,
            })?;
        let deps = ResolvedDependencies::new(names.clone(), instances);

        let settings = ControllerSettings::new(app.clone(), request, action, registration.clone());
        let instance = (registration.construct)(settings, deps).map_err(|source| {
            FactoryError::Construction {
                controller: controller.to_string(),
                source,
            }
        })?;

        tracing::trace!(controller = %controller, "Controller constructed");

        Ok(ControllerInstance {
            controller: instance,
            registration,
        })
    }
}

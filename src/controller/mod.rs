//! Controllers and their construction.
//!
//! # Data Flow
//! ```text
//! matched route
//!     → factory.rs (resolve constructor dependencies, build settings)
//!     → Controller::construct (settings + dependencies)
//!     → Controller::invoke (action name + bound arguments)
//!     → ActionResponse
//! ```
//!
//! # Design Decisions
//! - A controller declares its methods as data (`descriptor`) and dispatches
//!   on the raw action name in `invoke`; there is no reflection
//! - A new instance is constructed for every request

pub mod args;
pub mod error;
pub mod factory;
pub mod settings;

use std::sync::Arc;

use futures_util::future::BoxFuture;

pub use args::{ActionArgs, ResolvedDependencies};
pub use error::ActionError;
pub use factory::{ControllerFactory, ControllerInstance, FactoryError};
pub use settings::{ActionContext, ControllerSettings, RequestContext};

use crate::http::response::ActionResponse;
use crate::routing::ControllerDescriptor;

/// A routable controller type.
pub trait Controller: Send + Sync + 'static {
    /// Methods, constructor parameters, prefix and view overrides of the type.
    fn descriptor() -> ControllerDescriptor
    where
        Self: Sized;

    /// Build an instance for one request.
    fn construct(settings: ControllerSettings, deps: ResolvedDependencies) -> Result<Self, ActionError>
    where
        Self: Sized;

    /// Run the action declared as `action` (raw method name).
    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ActionArgs,
    ) -> BoxFuture<'a, Result<ActionResponse, ActionError>>;
}

pub(crate) type ConstructFn = Arc<
    dyn Fn(ControllerSettings, ResolvedDependencies) -> Result<Box<dyn Controller>, ActionError>
        + Send
        + Sync,
>;

/// A controller type as handed to the registry.
#[derive(Clone)]
pub struct ControllerType {
    descriptor: ControllerDescriptor,
    construct: ConstructFn,
}

impl ControllerType {
    pub fn of<C: Controller>() -> Self {
        Self {
            descriptor: C::descriptor(),
            construct: Arc::new(|settings: ControllerSettings, deps: ResolvedDependencies| {
                C::construct(settings, deps).map(|c| Box::new(c) as Box<dyn Controller>)
            }),
        }
    }

    pub fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    pub(crate) fn constructor(&self) -> ConstructFn {
        self.construct.clone()
    }
}

impl std::fmt::Debug for ControllerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ControllerType")
            .field(&self.descriptor.type_name)
            .finish()
    }
}

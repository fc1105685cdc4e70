//! Convention-routed controller dispatcher.
//!
//! Controller types describe their methods as data; the router derives an
//! HTTP route table from the method names and builds a fresh controller per
//! request, filling its constructor from a lifetime-aware dependency container.
//!
//! # Architecture Overview
//!
//! ```text
//!   boot                                    per request
//!   ────                                    ───────────
//!   config ──▶ DependencyContainer          axum route match
//!                     ▲                           │
//!   ControllerType[]  │                           ▼
//!     │               │                    RequestDispatcher
//!     ▼               │                           │
//!   RouteSynthesizer  └────────────────── ControllerFactory
//!     │                                           │
//!     ▼                                           ▼
//!   ControllerRegistry ◀── reload ──      Controller::invoke ──▶ ViewResolver
//!     │                                           │
//!     ▼                                           ▼
//!   axum Router                            ActionResponse / ErrorHandler
//! ```

// Core subsystems
pub mod container;
pub mod controller;
pub mod routing;
pub mod views;

// Transport
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod app;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use app::AppContext;
pub use config::AppConfig;
pub use container::{DependencyContainer, DependencySpec, Lifetime, StaticModules};
pub use controller::{
    ActionArgs, ActionError, Controller, ControllerSettings, ControllerType, ResolvedDependencies,
};
pub use http::{ActionResponse, HttpServer, RequestDispatcher};
pub use lifecycle::Shutdown;
pub use routing::{ControllerDescriptor, ControllerRegistry, MethodMeta};

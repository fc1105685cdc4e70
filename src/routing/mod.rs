//! Convention-based routing.
//!
//! # Data Flow
//! ```text
//! Boot / reload:
//!     ControllerType (descriptor: methods + parameter names)
//!     → synthesizer.rs (verb prefix → route, ranking, dependency names)
//!     → registry.rs (view search path, view cache, conflict checks)
//!     → ControllerRegistry (swapped atomically on reload)
//!
//! Per request:
//!     axum route for (verb, mount path)
//!     → crate::http::dispatcher
//! ```
//!
//! # Design Decisions
//! - Routes are derived from declared method names only
//! - Deterministic: the same types always yield the same route table

pub mod meta;
pub mod registry;
pub mod synthesizer;
pub mod verb;

pub use meta::{ControllerDescriptor, MethodMeta, RegisterRoutesFn};
pub use registry::{mount_path, ControllerRegistry, ControllerTypeRegistration};
pub use synthesizer::{
    placeholders, route_shape, routes_overlap, synthesize, RouteDescriptor, SynthesisError,
    SynthesizedController,
};
pub use verb::HttpVerb;

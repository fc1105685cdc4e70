//! Dependency container subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (boot):
//!     DependencySpec (module ref | builder, lifetime, configure hook)
//!     → registry.rs (validate, store DependencyEntry)
//!
//! Resolution (per request):
//!     name → registry.rs
//!         → Singleton: cached instance, or construct once and cache
//!         → Transient: construct fresh
//!     construct:
//!         module ref → modules.rs (ModuleResolver) → constructor(app) | value
//!         builder    → builder(BuildContext).await
//!         configure  → hook(instance, BuildContext).await → maybe replaced instance
//! ```
//!
//! # Design Decisions
//! - Instances are type-erased `Arc<dyn Any>`; typed access downcasts
//! - Each singleton owns an in-flight construction cell, so concurrent first
//!   use builds exactly one instance
//! - `resolve_many` is sequential to keep builder side effects ordered

use std::any::Any;
use std::sync::Arc;

pub mod error;
pub mod modules;
pub mod registry;
pub mod spec;

pub use error::{ContainerError, ContainerResult};
pub use modules::{ModuleExport, ModuleResolver, StaticModules};
pub use registry::DependencyContainer;
pub use spec::{BuildContext, DependencySpec, Lifetime};

/// A live dependency instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed error returned by user supplied constructors and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

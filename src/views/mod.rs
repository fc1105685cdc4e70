//! View lookup subsystem.
//!
//! # Data Flow
//! ```text
//! action asks for a view (name, or the action's default view)
//!     → resolver.rs: controller cache hit? → cached lookup
//!     → miss: search dirs × extensions → first existing file
//!     → cache result → ActionResponse::File / ::Render
//! ```

pub mod resolver;

pub use resolver::{ViewCache, ViewError, ViewLookup, ViewResolver, ViewScope};

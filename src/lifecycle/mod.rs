//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Ctrl+C / SIGTERM → Shutdown::trigger
//!     → HttpServer stops accepting, drains in-flight requests
//!     → ConfigWatcher task ends
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;

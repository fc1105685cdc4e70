//! HTTP transport around the dispatcher.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace, timeout, body limit)
//!     → dispatcher.rs (route match, controller construction, action)
//!     → response.rs (files, templates, JSON)
//!     ↘ error.rs (single error handler)
//! ```

pub mod dispatcher;
pub mod error;
pub mod response;
pub mod server;

pub use dispatcher::{action, ActionTarget, DispatchState, RequestDispatcher, X_REQUEST_ID};
pub use error::{DefaultErrorHandler, DispatchError, ErrorHandler};
pub use response::{ActionResponse, PlaceholderRenderer, ResponseError, TemplateRenderer};
pub use server::{HttpServer, ServerError};

//! Errors raised while constructing controllers and running actions.

use axum::http::StatusCode;
use thiserror::Error;

use crate::container::{BoxError, ContainerError};
use crate::views::ViewError;

/// Error returned by an action, or by a controller constructor.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The controller has no action under this name.
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    /// A parameter is in neither the path nor the body.
    #[error("missing parameter `{0}`")]
    MissingParameter(String),

    /// A parameter is present but unusable.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A resolved dependency has an unexpected type or position.
    #[error("dependency `{name}` unavailable: {reason}")]
    Dependency { name: String, reason: String },

    /// Resolving a dependency from inside the action failed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// View lookup failed.
    #[error(transparent)]
    View(#[from] ViewError),

    /// The action decided on an explicit status.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Anything else the action could not handle.
    #[error(transparent)]
    Internal(#[from] BoxError),
}

impl ActionError {
    /// Shorthand for an explicit status with a message.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        ActionError::Status {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    /// Status code reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActionError::UnknownAction(_) => StatusCode::NOT_FOUND,
            ActionError::MissingParameter(_) | ActionError::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            ActionError::Status { status, .. } => *status,
            ActionError::Dependency { .. }
            | ActionError::Container(_)
            | ActionError::View(_)
            | ActionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

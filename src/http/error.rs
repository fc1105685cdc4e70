//! Centralized handling of per-request failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::controller::{ActionError, FactoryError, RequestContext};
use crate::http::response::ResponseError;

/// Anything that can go wrong between route match and response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error("action `{action}` of controller `{controller}` failed")]
    Action {
        controller: String,
        action: String,
        #[source]
        source: ActionError,
    },

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("action `{action}` of controller `{controller}` panicked")]
    Panicked { controller: String, action: String },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Factory(FactoryError::Construction { source, .. }) => source.status_code(),
            DispatchError::Factory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Action { source, .. } => source.status_code(),
            DispatchError::Response(_) | DispatchError::Panicked { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Turns a dispatch failure into the response sent to the client.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: DispatchError, request: &RequestContext) -> Response;
}

/// Logs the failure and answers with a JSON status body.
///
/// Server errors only carry the canonical reason; client errors also carry
/// the error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: DispatchError, request: &RequestContext) -> Response {
        let status = error.status_code();
        let request_id = request.request_id.as_deref().unwrap_or("unknown");

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                error = %error,
                cause = ?std::error::Error::source(&error).map(ToString::to_string),
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                error = %error,
                "Request rejected"
            );
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let mut body = serde_json::json!({
            "error": reason,
            "status": status.as_u16(),
            "request_id": request_id,
        });
        if status.is_client_error() {
            body["detail"] = serde_json::Value::String(client_detail(&error));
        }
        (status, Json(body)).into_response()
    }
}

fn client_detail(error: &DispatchError) -> String {
    match error {
        DispatchError::Action { source, .. } => source.to_string(),
        DispatchError::Factory(FactoryError::Construction { source, .. }) => source.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_action_error() {
        let err = DispatchError::Action {
            controller: "user".into(),
            action: "getUser".into(),
            source: ActionError::MissingParameter("name".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = DispatchError::Factory(FactoryError::ControllerNotFound("user".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_server_error_hides_detail() {
        let err = DispatchError::Factory(FactoryError::ControllerNotFound("secret".into()));
        let request = RequestContext {
            request_id: Some("req-1".into()),
            ..Default::default()
        };
        let response = DefaultErrorHandler.handle(err, &request);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["request_id"], "req-1");
        assert!(body.get("detail").is_none());
        assert!(!String::from_utf8_lossy(&bytes).contains("secret"));
    }

    #[tokio::test]
    async fn test_client_error_carries_detail() {
        let err = DispatchError::Action {
            controller: "user".into(),
            action: "getUser".into(),
            source: ActionError::MissingParameter("name".into()),
        };
        let response = DefaultErrorHandler.handle(err, &RequestContext::default());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(body["detail"], "missing parameter `name`");
    }
}

//! Action results and their conversion into HTTP responses.
//!
//! # Responsibilities
//! - Define what an action may answer with
//! - Send view files, rendering templates through a `TemplateRenderer`
//! - Pick the content type from the file extension
//!
//! # Design Decisions
//! - Files are read with `tokio::fs`, never on the runtime's worker threads
//! - Rendering is a collaborator; the built-in renderer only substitutes
//!   `{{ key }}` with top-level model fields

use std::path::{Path, PathBuf};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

use crate::container::BoxError;

/// What an action answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResponse {
    /// Send a file verbatim.
    File(PathBuf),
    /// Render a template with a model.
    Render { template: PathBuf, model: Value },
    Json(Value),
    Text(String),
    /// Empty body with a status.
    Status(StatusCode),
}

impl ActionResponse {
    pub fn send_file(path: impl Into<PathBuf>) -> Self {
        ActionResponse::File(path.into())
    }

    pub fn render(template: impl Into<PathBuf>, model: Value) -> Self {
        ActionResponse::Render {
            template: template.into(),
            model,
        }
    }

    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, BoxError> {
        Ok(ActionResponse::Json(serde_json::to_value(value)?))
    }

    pub fn send_status(status: StatusCode) -> Self {
        ActionResponse::Status(status)
    }

    pub fn text(body: impl Into<String>) -> Self {
        ActionResponse::Text(body.into())
    }

    /// Turn into an HTTP response, reading and rendering files as needed.
    pub async fn into_http(self, renderer: &dyn TemplateRenderer) -> Result<Response, ResponseError> {
        match self {
            ActionResponse::File(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|source| ResponseError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
            }
            ActionResponse::Render { template, model } => {
                let source = tokio::fs::read_to_string(&template)
                    .await
                    .map_err(|source| ResponseError::Io {
                        path: template.clone(),
                        source,
                    })?;
                let body = renderer
                    .render(&template, &source, &model)
                    .map_err(|source| ResponseError::Render {
                        template: template.clone(),
                        source,
                    })?;
                Ok(([(header::CONTENT_TYPE, renderer.content_type(&template))], body).into_response())
            }
            ActionResponse::Json(value) => Ok(Json(value).into_response()),
            ActionResponse::Text(body) => Ok(body.into_response()),
            ActionResponse::Status(status) => Ok(status.into_response()),
        }
    }
}

/// Failures while producing the HTTP response of an action.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render `{}`", template.display())]
    Render {
        template: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Renders non-HTML view templates.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &Path, source: &str, model: &Value) -> Result<String, BoxError>;

    /// Content type of the rendered output.
    fn content_type(&self, _template: &Path) -> HeaderValue {
        HeaderValue::from_static("text/html; charset=utf-8")
    }
}

/// Replaces `{{ key }}` with the model's top-level field `key`.
///
/// Unknown keys render as empty strings; strings are inserted without quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, _template: &Path, source: &str, model: &Value) -> Result<String, BoxError> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start..].find("}}") else {
                break;
            };
            out.push_str(&rest[..start]);
            let key = rest[start + 2..start + len].trim();
            match model.get(key) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) | None => {}
                Some(other) => out.push_str(&other.to_string()),
            }
            rest = &rest[start + len + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Content type by file extension.
pub fn content_type(path: &Path) -> HeaderValue {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mime = match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    };
    HeaderValue::from_static(mime)
}

//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that deserialize fine but
//! cannot boot a dispatcher. All problems are reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address `{0}`")]
    BindAddress(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("at least one view extension is required")]
    NoViewExtensions,

    #[error("view extension `{0}` must start with a dot")]
    ViewExtension(String),

    #[error("dependency `{0}` has an empty module reference")]
    EmptyModule(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("admin endpoint enabled without an API key")]
    MissingAdminKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.views.extensions.is_empty() {
        errors.push(ValidationError::NoViewExtensions);
    }
    for ext in &config.views.extensions {
        if !ext.starts_with('.') {
            errors.push(ValidationError::ViewExtension(ext.clone()));
        }
    }

    for (name, dependency) in &config.dependencies {
        if dependency.module.trim().is_empty() {
            errors.push(ValidationError::EmptyModule(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

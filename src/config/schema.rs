//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::container::Lifetime;

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, handed to dependencies through the app context.
    pub name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// View lookup settings.
    pub views: ViewConfig,

    /// Dependency declarations keyed by dependency name.
    pub dependencies: BTreeMap<String, DependencyConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// View lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Root directory holding one sub-directory per controller.
    pub root: PathBuf,

    /// Directory (relative to `root`) probed after the controller's own.
    pub shared_dir: String,

    /// Allowed view file extensions, in preference order.
    pub extensions: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("views"),
            shared_dir: "shared".to_string(),
            extensions: vec![".html".to_string()],
        }
    }
}

impl ViewConfig {
    /// Search path for a controller: its own directory first, then the shared one.
    pub fn search_path_for(&self, controller_name: &str) -> Vec<PathBuf> {
        vec![self.root.join(controller_name), self.root.join(&self.shared_dir)]
    }
}

/// A dependency declared in configuration.
///
/// Only module references can be expressed in a config file; builder
/// functions are registered in code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Module reference resolved through the module resolver.
    pub module: String,

    /// Lifetime policy ("Lifetime" or "SingleUse").
    #[serde(default)]
    pub lifespan: Lifetime,

    /// Replace an entry already registered in code under the same name.
    #[serde(default)]
    pub overwrite: bool,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Expose the route table under `/admin/routes`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("name = \"demo\"").unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.views.extensions, vec![".html".to_string()]);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn test_dependency_lifespan_names() {
        let raw = r#"
            [dependencies.vault]
            module = "vault"
            lifespan = "Lifetime"

            [dependencies.clock]
            module = "clock"
            lifespan = "SingleUse"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.dependencies["vault"].lifespan, Lifetime::Singleton);
        assert_eq!(config.dependencies["clock"].lifespan, Lifetime::Transient);
    }

    #[test]
    fn test_search_path_order() {
        let views = ViewConfig {
            root: PathBuf::from("/srv/views"),
            ..ViewConfig::default()
        };
        assert_eq!(
            views.search_path_for("user"),
            vec![PathBuf::from("/srv/views/user"), PathBuf::from("/srv/views/shared")]
        );
    }
}

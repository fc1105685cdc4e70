//! Application context shared by the dispatcher and handed to dependencies.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::AppConfig;

/// Handle to the running application.
///
/// Cheap to clone. The configuration behind it is swapped atomically on reload,
/// so holders always observe a complete config.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ArcSwap<AppConfig>>,
}

impl AppContext {
    /// Create a context around an initial configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<AppConfig> {
        self.inner.load_full()
    }

    /// Application name from the current configuration.
    pub fn name(&self) -> String {
        self.inner.load().name.clone()
    }

    /// Swap in a new configuration.
    pub fn replace_config(&self, config: AppConfig) {
        self.inner.store(Arc::new(config));
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("name", &self.inner.load().name)
            .finish()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

//! Configuration file watcher.
//!
//! # Responsibilities
//! - Watch the directory holding the config file (editors often replace the
//!   file instead of writing it in place)
//! - Re-read and validate the file when an event touches it
//! - Forward only valid configurations whose content actually changed
//!
//! # Design Decisions
//! - An invalid file is logged and skipped; the running configuration stays
//! - The last forwarded content is remembered so duplicate events are dropped

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::AppConfig;

/// Watches one configuration file and publishes validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Events stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let reloader = Reloader::new(self.path.clone());
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if !reloader.concerns(&event) {
                        return;
                    }
                    if let Some(config) = reloader.reload() {
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last: Mutex<Option<String>>,
}

impl Reloader {
    fn new(path: PathBuf) -> Self {
        let last = std::fs::read_to_string(&path).ok();
        Self {
            path,
            last: Mutex::new(last),
        }
    }

    fn concerns(&self, event: &Event) -> bool {
        let name = self.path.file_name();
        event.paths.iter().any(|p| p.file_name() == name)
    }

    /// Read the file; a config is returned only if it changed and is valid.
    fn reload(&self) -> Option<AppConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Config file unreadable, keeping current configuration");
                return None;
            }
        };

        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.as_deref() == Some(content.as_str()) {
            return None;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, reloading");
                *last = Some(content);
                Some(config)
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Invalid config, keeping current configuration");
                None
            }
        }
    }
}

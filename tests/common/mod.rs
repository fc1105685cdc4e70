//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use controller_dispatch::container::StaticModules;
use controller_dispatch::{
    AppConfig, AppContext, ControllerRegistry, ControllerType, DependencyContainer, HttpServer,
    RequestDispatcher, Shutdown,
};

/// A server running on an ephemeral port. Shuts down on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub app: AppContext,
    pub registry: Arc<ControllerRegistry>,
    pub config_updates: mpsc::UnboundedSender<AppConfig>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server over `types`.
///
/// `setup` registers dependencies; `customize` may swap the error handler or
/// renderer.
pub async fn spawn_server<S, C>(
    config: AppConfig,
    modules: StaticModules,
    types: Vec<ControllerType>,
    setup: S,
    customize: C,
) -> TestServer
where
    S: FnOnce(&DependencyContainer),
    C: FnOnce(RequestDispatcher) -> RequestDispatcher,
{
    let app = AppContext::new(config.clone());
    let container = DependencyContainer::new(app.clone(), Arc::new(modules));
    setup(&container);

    let registry = Arc::new(ControllerRegistry::build(types, &config.views).unwrap());
    let dispatcher = customize(RequestDispatcher::new(app.clone(), registry.clone(), container));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(app.clone(), dispatcher);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    TestServer {
        addr,
        app,
        registry,
        config_updates,
        shutdown,
    }
}

/// Client that never reuses connections or goes through a proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Write `content` to `root/relative`, creating directories.
pub fn write_view(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

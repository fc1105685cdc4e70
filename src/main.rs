//! controller-dispatch binary.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use controller_dispatch::config::{load_config, watcher::ConfigWatcher, AppConfig};
use controller_dispatch::observability::{logging, metrics};
use controller_dispatch::{
    AppContext, ControllerRegistry, DependencyContainer, HttpServer, RequestDispatcher, Shutdown,
};

#[derive(Parser)]
#[command(name = "controller-dispatch")]
#[command(about = "Convention-routed controller dispatcher", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability);
    tracing::info!(name = %config.name, version = env!("CARGO_PKG_VERSION"), "Starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = AppContext::new(config.clone());

    let container = DependencyContainer::new(app.clone(), Arc::new(demo::modules()));
    demo::register_dependencies(&container)?;
    container.register_configured(&config.dependencies)?;

    let registry = Arc::new(ControllerRegistry::build(demo::controller_types(), &config.views)?);
    let dispatcher = RequestDispatcher::new(app.clone(), registry, container);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.trigger_on_signal().await });

    HttpServer::new(app, dispatcher)
        .run(listener, config_updates, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

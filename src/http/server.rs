//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the dispatcher's router in transport middleware (request id,
//!   tracing, timeout, body limit)
//! - Mount the admin routes when enabled
//! - Apply configuration updates by reloading the controller registry
//! - Serve until the shutdown signal fires

use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::app::AppContext;
use crate::config::AppConfig;
use crate::http::dispatcher::RequestDispatcher;
use crate::routing::SynthesisError;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("routes could not be bound: {0}")]
    Routes(#[from] SynthesisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP front of the dispatcher.
pub struct HttpServer {
    app: AppContext,
    dispatcher: RequestDispatcher,
}

impl HttpServer {
    pub fn new(app: AppContext, dispatcher: RequestDispatcher) -> Self {
        Self { app, dispatcher }
    }

    /// Build the full router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Result<Router, SynthesisError> {
        let config = self.app.config();
        let mut router = self.dispatcher.router()?;

        if config.admin.enabled {
            router = router.merge(admin::admin_router(
                self.app.clone(),
                self.dispatcher.registry().clone(),
            ));
        }

        Ok(router
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the live config and
    /// rebuild the controller registry. Listener, timeout and body limit
    /// settings only take effect on restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let router = self.router()?;

        let app = self.app.clone();
        let registry = self.dispatcher.registry().clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match registry.reload(&config.views).await {
                    Ok(generation) => {
                        app.replace_config(config);
                        tracing::info!(generation, "Configuration applied");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reload failed, keeping previous configuration");
                    }
                }
            }
        });

        tracing::info!(address = %addr, app = %self.app.name(), "HTTP server starting");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

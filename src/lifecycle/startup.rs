//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind listeners and begin accepting traffic
//! - Stop every listener on the first shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)
//! - A listener that dies on its own takes the others down with it

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{serve_admin, setup_admin_router, AdminState};
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::proxy::BuildError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Run the relay until a shutdown signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone())?;
    let shutdown = Shutdown::new();

    let admin = if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(AdminState::new(server.proxy(), &config.admin.api_key));
        Some(tokio::spawn(serve_admin(listener, router, shutdown.subscribe())))
    } else {
        None
    };

    let listener = bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let serving = server.run(listener, shutdown.subscribe());
    tokio::pin!(serving);

    let result = tokio::select! {
        result = &mut serving => result,
        _ = signals::shutdown_signal() => {
            shutdown.trigger();
            serving.await
        }
    };
    shutdown.trigger();

    if let Some(admin) = admin {
        match admin.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin listener failed"),
            Err(e) => tracing::error!(error = %e, "Admin listener task panicked"),
            Ok(Ok(())) => {}
        }
    }

    result.map_err(StartupError::from)
}

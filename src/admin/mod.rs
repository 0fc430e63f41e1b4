//! Admin API on its own listener.
//!
//! Served apart from the public listener so that nothing reachable through
//! the public origin is ever answered locally except the reserved 404s.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::shutdown;
use crate::proxy::ForwardingProxy;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub proxy: Arc<ForwardingProxy>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(proxy: Arc<ForwardingProxy>, api_key: &str) -> Self {
        Self {
            proxy,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/health", get(get_health))
        .route("/admin/status", get(get_status))
        .route("/admin/config", get(get_config))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin router until shutdown.
pub async fn serve_admin(
    listener: TcpListener,
    router: Router,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin listener starting");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::wait(shutdown))
        .await
}

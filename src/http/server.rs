//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all relay handler
//! - Wire up middleware (request ID, tracing, concurrency limit)
//! - Turn each request into an InboundRequest and render the outcome
//! - Log and record metrics for every request
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{read_inbound, MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::{BuildError, ForwardingProxy, ForwardingSettings, ProxyError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ForwardingProxy>,
    pub max_body_size: usize,
    pub reencode_json: bool,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    proxy: Arc<ForwardingProxy>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        let settings = ForwardingSettings::from_config(&config)?;
        Self::with_settings(config, settings)
    }

    /// Create a server whose forwarding settings are supplied directly.
    ///
    /// The listener, limits and body handling still come from `config`.
    pub fn with_settings(config: ProxyConfig, settings: ForwardingSettings) -> Result<Self, BuildError> {
        let proxy = Arc::new(ForwardingProxy::new(settings)?);

        let state = AppState {
            proxy: proxy.clone(),
            max_body_size: config.security.max_body_size,
            reencode_json: config.upstream.reencode_json,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            proxy,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request.headers().request_id()
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_concurrent_requests,
            ))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let settings = self.proxy.settings();
        tracing::info!(
            address = %addr,
            upstream = %settings.upstream,
            public = %settings.public,
            redirect_policy = ?settings.redirect_policy,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The relay shared by every request.
    pub fn proxy(&self) -> Arc<ForwardingProxy> {
        self.proxy.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Relay handler for every path and method.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request.headers().request_id().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let inbound = match read_inbound(request, client_addr, state.max_body_size, state.reencode_json).await {
        Ok(inbound) => inbound,
        Err(rejection) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %rejection, "Request rejected");
            let response = rejection.into_response();
            metrics::record_request(method.as_str(), response.status().as_u16(), "rejected", start);
            return response;
        }
    };

    match state.proxy.handle(inbound).await {
        Ok(relayed) => {
            let status = relayed.status;
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Relayed"
            );
            metrics::record_request(method.as_str(), status.as_u16(), "relayed", start);
            relayed.into_response()
        }
        Err(err) => {
            let status = err.status();
            match &err {
                ProxyError::LoopPrevented { .. } => {
                    tracing::warn!(request_id = %request_id, path = %path, "Reserved path, not forwarded");
                }
                _ => {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        upstream_target = err.target().unwrap_or_default(),
                        error = %err,
                        "Upstream failure"
                    );
                }
            }
            metrics::record_request(method.as_str(), status.as_u16(), err.kind(), start);
            err.into_response()
        }
    }
}

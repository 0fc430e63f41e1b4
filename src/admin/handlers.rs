use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::{ErrorBodyPolicy, RedirectPolicy};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

/// Forwarding settings as seen by operators. Never carries the API key.
#[derive(Serialize)]
pub struct EffectiveConfig {
    pub upstream_origin: String,
    pub public_origin: String,
    pub redirect_policy: RedirectPolicy,
    pub max_redirects: usize,
    pub error_body: ErrorBodyPolicy,
    pub reserved_prefix: String,
    pub forward_headers: Vec<String>,
    pub connect_timeout_secs: u64,
    pub upstream_timeout_secs: u64,
}

pub async fn get_health() -> &'static str {
    "OK - relay is running"
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_config(State(state): State<AdminState>) -> Json<EffectiveConfig> {
    let settings = state.proxy.settings();
    Json(EffectiveConfig {
        upstream_origin: settings.upstream.to_string(),
        public_origin: settings.public.to_string(),
        redirect_policy: settings.redirect_policy,
        max_redirects: settings.max_redirects,
        error_body: settings.error_body,
        reserved_prefix: settings.reserved.prefix().to_string(),
        forward_headers: settings
            .headers
            .extra
            .iter()
            .map(|name| name.as_str().to_string())
            .collect(),
        connect_timeout_secs: settings.connect_timeout.as_secs(),
        upstream_timeout_secs: settings.upstream_timeout.as_secs(),
    })
}

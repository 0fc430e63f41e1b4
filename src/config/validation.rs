//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate origins (absolute http/https, no path)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Validate header names and addresses ahead of first use
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::{ProxyConfig, RedirectPolicy};
use crate::proxy::target::Origin;
use crate::security::headers::is_never_forwarded;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "upstream.origin").
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::new(
            "listener.max_concurrent_requests",
            "must be greater than 0",
        ));
    }

    let upstream = Origin::parse(&config.upstream.origin)
        .map_err(|e| errors.push(ValidationError::new("upstream.origin", e.to_string())))
        .ok();
    let public = Origin::parse(&config.upstream.public_origin)
        .map_err(|e| errors.push(ValidationError::new("upstream.public_origin", e.to_string())))
        .ok();
    if let (Some(upstream), Some(public)) = (upstream, public) {
        if upstream == public {
            errors.push(ValidationError::new(
                "upstream.public_origin",
                "must differ from upstream.origin",
            ));
        }
    }

    if config.upstream.redirect_policy == RedirectPolicy::Follow && config.upstream.max_redirects == 0 {
        errors.push(ValidationError::new(
            "upstream.max_redirects",
            "must be greater than 0 when redirect_policy = \"follow\"",
        ));
    }

    for name in &config.upstream.forward_headers {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header) if is_never_forwarded(&header) => errors.push(ValidationError::new(
                "upstream.forward_headers",
                format!("`{}` is never forwarded", name),
            )),
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::new(
                "upstream.forward_headers",
                format!("`{}` is not a valid header name", name),
            )),
        }
    }

    if config.upstream.user_agent.is_empty()
        || HeaderValue::from_str(&config.upstream.user_agent).is_err()
    {
        errors.push(ValidationError::new(
            "upstream.user_agent",
            "must be a non-empty, valid header value",
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    let prefix = &config.routing.reserved_prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::new(
            "routing.reserved_prefix",
            "must start with '/' and name at least one path segment",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin listener is enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("`{}` is not a socket address", value),
        ));
    }
}

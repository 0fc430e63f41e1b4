//! Header projection for both legs of the relay.
//!
//! # Responsibilities
//! - Build the outbound header set from an allow-list
//! - Set `X-Forwarded-For` to the client IP; `Host` comes from the target URL
//! - Drop framing, hop-by-hop and HSTS headers from upstream responses
//!
//! # Design Decisions
//! - Allow-list on the way out: unknown request headers are not forwarded
//! - Never trust existing X-Forwarded-* from the caller
//! - Deny-list on the way back: everything else the upstream sends is relayed

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::request::X_REQUEST_ID;

/// Request headers forwarded by default.
static DEFAULT_FORWARDED: [HeaderName; 3] = [
    header::USER_AGENT,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
];

/// Request headers that are never forwarded, even when allow-listed.
const NEVER_FORWARDED: [&str; 11] = [
    "host",
    "content-length",
    "accept-encoding",
    "connection",
    "upgrade",
    "keep-alive",
    "transfer-encoding",
    "te",
    "proxy-authorization",
    "x-forwarded-host",
    "x-forwarded-proto",
];

/// Upstream response headers dropped before relaying.
static DROPPED_FROM_RESPONSE: [HeaderName; 6] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::UPGRADE,
    header::STRICT_TRANSPORT_SECURITY,
];

/// Whether a request header can never be forwarded upstream.
pub fn is_never_forwarded(name: &HeaderName) -> bool {
    NEVER_FORWARDED.contains(&name.as_str())
}

/// Inputs for projecting inbound headers onto an upstream request.
#[derive(Debug, Clone)]
pub struct HeaderProjection {
    /// Extra request headers forwarded on top of the default set.
    pub extra: Vec<HeaderName>,
    /// User-Agent sent when the caller did not provide one.
    pub default_user_agent: HeaderValue,
}

impl HeaderProjection {
    /// Build the outbound header set.
    ///
    /// `content-type` is only carried when a body is forwarded.
    pub fn project(
        &self,
        inbound: &HeaderMap,
        client_ip: IpAddr,
        with_body: bool,
    ) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for name in DEFAULT_FORWARDED.iter().chain(self.extra.iter()) {
            if is_never_forwarded(name) {
                continue;
            }
            for value in inbound.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        if let Some(request_id) = inbound.get(X_REQUEST_ID) {
            headers.insert(X_REQUEST_ID, request_id.clone());
        }

        if with_body {
            if let Some(content_type) = inbound.get(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, content_type.clone());
            }
        }

        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, self.default_user_agent.clone());
        }

        if let Ok(xff) = HeaderValue::from_str(&client_ip.to_string()) {
            headers.insert("x-forwarded-for", xff);
        }

        headers
    }
}

/// Copy upstream response headers, dropping the ones invalidated by relaying.
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in DROPPED_FROM_RESPONSE.iter() {
        headers.remove(name);
    }
    headers
}

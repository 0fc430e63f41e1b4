//! The forwarding pipeline.
//!
//! ```text
//! InboundRequest
//!     → reserved namespace? → LoopPrevented (404, no upstream call)
//!     → target = upstream origin + path?query
//!     → header projection, body projection
//!     → one upstream exchange under a deadline
//!     → header relay, Location rewrite, body rewrite by content class
//!     → RelayedResponse
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use reqwest::redirect;

use crate::config::{ErrorBodyPolicy, ProxyConfig, RedirectPolicy};
use crate::proxy::error::{BuildError, ProxyError};
use crate::proxy::rewrite::{ContentClass, OriginRewriter};
use crate::proxy::target::Origin;
use crate::resilience::timeouts::within;
use crate::routing::ReservedNamespace;
use crate::security::headers::{relay_response_headers, HeaderProjection};

/// A request as received from the caller.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path including the query string, e.g. `/escalas/?mes=10`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: InboundBody,
    pub client_addr: SocketAddr,
}

/// Inbound body as handed to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    Empty,
    /// Forwarded byte for byte.
    Raw(Bytes),
    /// Already parsed; re-serialized as `application/json`.
    Json(serde_json::Value),
}

/// Response handed back to the caller.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Everything the relay needs, resolved from configuration once.
#[derive(Debug, Clone)]
pub struct ForwardingSettings {
    pub upstream: Origin,
    pub public: Origin,
    pub reserved: ReservedNamespace,
    pub redirect_policy: RedirectPolicy,
    pub max_redirects: usize,
    pub error_body: ErrorBodyPolicy,
    pub headers: HeaderProjection,
    pub connect_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl ForwardingSettings {
    /// Settings with default policies between two origins.
    pub fn new(upstream: Origin, public: Origin) -> Self {
        let defaults = ProxyConfig::default();
        Self {
            upstream,
            public,
            reserved: ReservedNamespace::new(defaults.routing.reserved_prefix),
            redirect_policy: defaults.upstream.redirect_policy,
            max_redirects: defaults.upstream.max_redirects,
            error_body: defaults.upstream.error_body,
            headers: HeaderProjection {
                extra: Vec::new(),
                default_user_agent: HeaderValue::from_static(concat!(
                    "origin-relay/",
                    env!("CARGO_PKG_VERSION")
                )),
            },
            connect_timeout: Duration::from_secs(defaults.timeouts.connect_secs),
            upstream_timeout: Duration::from_secs(defaults.timeouts.upstream_secs),
        }
    }

    /// Resolve settings from a validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, BuildError> {
        let upstream = Origin::parse(&config.upstream.origin).map_err(|source| BuildError::Origin {
            field: "upstream.origin",
            source,
        })?;
        let public =
            Origin::parse(&config.upstream.public_origin).map_err(|source| BuildError::Origin {
                field: "upstream.public_origin",
                source,
            })?;

        let extra = config
            .upstream
            .forward_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| BuildError::Header(format!("`{}` is not a header name", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let default_user_agent = HeaderValue::from_str(&config.upstream.user_agent)
            .map_err(|_| BuildError::Header("user_agent is not a valid header value".into()))?;

        Ok(Self {
            upstream,
            public,
            reserved: ReservedNamespace::new(config.routing.reserved_prefix.clone()),
            redirect_policy: config.upstream.redirect_policy,
            max_redirects: config.upstream.max_redirects,
            error_body: config.upstream.error_body,
            headers: HeaderProjection {
                extra,
                default_user_agent,
            },
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        })
    }
}

/// Relays requests to one fixed upstream origin.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct ForwardingProxy {
    settings: ForwardingSettings,
    rewriter: OriginRewriter,
    client: reqwest::Client,
}

impl ForwardingProxy {
    /// Build the relay and its upstream client.
    pub fn new(settings: ForwardingSettings) -> Result<Self, BuildError> {
        let redirects = match settings.redirect_policy {
            RedirectPolicy::Follow => {
                follow_same_origin(settings.upstream.clone(), settings.max_redirects)
            }
            RedirectPolicy::Manual => redirect::Policy::none(),
        };
        let client = reqwest::Client::builder()
            .redirect(redirects)
            .connect_timeout(settings.connect_timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            rewriter: OriginRewriter::new(settings.upstream.clone(), settings.public.clone()),
            settings,
            client,
        })
    }

    pub fn settings(&self) -> &ForwardingSettings {
        &self.settings
    }

    /// Relay one request.
    ///
    /// Issues at most one upstream request. Upstream statuses, including
    /// 4xx/5xx, come back as `Ok`.
    pub async fn handle(&self, inbound: InboundRequest) -> Result<RelayedResponse, ProxyError> {
        if self.settings.reserved.contains(&inbound.path_and_query) {
            let path = inbound
                .path_and_query
                .split('?')
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(ProxyError::LoopPrevented { path });
        }

        let target = self.settings.upstream.resolve(&inbound.path_and_query);
        let (body, is_json) = project_body(&inbound.method, inbound.body);

        let mut headers = self.settings.headers.project(
            &inbound.headers,
            inbound.client_addr.ip(),
            body.is_some(),
        );
        if is_json {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut request = self
            .client
            .request(inbound.method.clone(), &target)
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        tracing::debug!(method = %inbound.method, url = %target, "Forwarding upstream");

        let limit = self.settings.upstream_timeout;
        let exchange = async move {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };

        let (status, upstream_headers, upstream_body) = match within(limit, exchange).await {
            Ok(Ok(parts)) => parts,
            Ok(Err(err)) => return Err(ProxyError::from_reqwest(&target, limit, err)),
            Err(_) => {
                return Err(ProxyError::Timeout {
                    target,
                    timeout: limit,
                })
            }
        };

        Ok(self.adapt(status, &upstream_headers, upstream_body))
    }

    /// Turn the upstream response into what the caller sees.
    fn adapt(&self, status: StatusCode, upstream_headers: &HeaderMap, body: Bytes) -> RelayedResponse {
        let mut headers = relay_response_headers(upstream_headers);

        let rewritten_location = headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|location| self.rewriter.rewrite_location(location).into_owned());
        if let Some(location) = rewritten_location {
            if let Ok(value) = HeaderValue::from_str(&location) {
                headers.insert(header::LOCATION, value);
            }
        }

        if self.settings.error_body == ErrorBodyPolicy::Synthesize
            && (status.is_client_error() || status.is_server_error())
        {
            let reason = status.canonical_reason().unwrap_or("Unknown Status");
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            return RelayedResponse {
                status,
                headers,
                body: Bytes::from(format!("Proxy Error: {}", reason)),
            };
        }

        let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let body = match ContentClass::of(content_type) {
            ContentClass::Html => self.rewriter.rewrite_html(body),
            ContentClass::Json | ContentClass::Opaque => body,
        };

        RelayedResponse {
            status,
            headers,
            body,
        }
    }
}

/// Follow redirects within the upstream origin only.
///
/// A hop to any other origin stops the chain and the 3xx is relayed as is,
/// so forwarded headers never reach a third party.
fn follow_same_origin(upstream: Origin, max_redirects: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error(format!("more than {} redirects", max_redirects))
        } else if upstream.same_origin(attempt.url()) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Body to send upstream and whether it was re-encoded as JSON.
fn project_body(method: &Method, body: InboundBody) -> (Option<Bytes>, bool) {
    if method == Method::GET || method == Method::HEAD {
        return (None, false);
    }
    match body {
        InboundBody::Empty => (None, false),
        InboundBody::Raw(bytes) => (Some(bytes), false),
        InboundBody::Json(value) => (Some(Bytes::from(value.to_string())), true),
    }
}

//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Enforce the inbound body size limit
//! - Turn an axum request into an [`InboundRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Content-Length checked before the body is read
//! - Bodies stay raw unless JSON re-encoding is enabled and the caller sent JSON

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::proxy::forwarder::{InboundBody, InboundRequest};
use crate::proxy::rewrite::ContentClass;

/// Header carrying the request ID on both legs.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a UUID v4 for requests arriving without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Read the request ID set by the request-ID layer.
pub trait RequestIdExt {
    /// The ID, or `"unknown"` when absent or not ASCII.
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Why an inbound request was refused before forwarding.
#[derive(Debug, Error)]
pub enum InboundRejection {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Unreadable(String),
}

/// Buffer the body and capture everything the relay needs.
pub async fn read_inbound(
    request: Request<Body>,
    client_addr: SocketAddr,
    max_body_size: usize,
    reencode_json: bool,
) -> Result<InboundRequest, InboundRejection> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_body_size) {
        return Err(InboundRejection::TooLarge { limit: max_body_size });
    }

    let bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|err| {
            let inner = err.into_inner();
            if inner.is::<LengthLimitError>() {
                InboundRejection::TooLarge { limit: max_body_size }
            } else {
                InboundRejection::Unreadable(inner.to_string())
            }
        })?;

    let body = if bytes.is_empty() {
        InboundBody::Empty
    } else if reencode_json && carries_json(&parts.method, &parts.headers) {
        match serde_json::from_slice(&bytes) {
            Ok(value) => InboundBody::Json(value),
            Err(_) => InboundBody::Raw(bytes),
        }
    } else {
        InboundBody::Raw(bytes)
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Ok(InboundRequest {
        method: parts.method,
        path_and_query,
        headers: parts.headers,
        body,
        client_addr,
    })
}

fn carries_json(method: &Method, headers: &HeaderMap) -> bool {
    if method == Method::GET || method == Method::HEAD {
        return false;
    }
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    ContentClass::of(content_type) == ContentClass::Json
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn client() -> SocketAddr {
        "198.51.100.4:51000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_raw_body_by_default() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/escalas/importar?mes=10")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"a": 1}"#))
            .unwrap();

        let inbound = read_inbound(request, client(), 1024, false).await.unwrap();
        assert_eq!(inbound.path_and_query, "/escalas/importar?mes=10");
        assert_eq!(inbound.body, InboundBody::Raw(Bytes::from_static(br#"{"a": 1}"#)));
        assert_eq!(inbound.client_addr, client());
    }

    #[tokio::test]
    async fn test_json_parsed_only_when_enabled_and_declared() {
        let json = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"a": 1}"#))
            .unwrap();
        let inbound = read_inbound(json, client(), 1024, true).await.unwrap();
        assert_eq!(inbound.body, InboundBody::Json(serde_json::json!({"a": 1})));

        let form = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("a=1"))
            .unwrap();
        let inbound = read_inbound(form, client(), 1024, true).await.unwrap();
        assert_eq!(inbound.body, InboundBody::Raw(Bytes::from_static(b"a=1")));

        let broken = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let inbound = read_inbound(broken, client(), 1024, true).await.unwrap();
        assert_eq!(inbound.body, InboundBody::Raw(Bytes::from_static(b"{not json")));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(vec![b'x'; 2048]))
            .unwrap();

        let err = read_inbound(request, client(), 1024, false).await.unwrap_err();
        assert!(matches!(err, InboundRejection::TooLarge { limit: 1024 }));
    }

    #[tokio::test]
    async fn test_empty_body_and_missing_path() {
        let request = Request::builder().uri("http://www.example.com").body(Body::empty()).unwrap();
        let inbound = read_inbound(request, client(), 1024, false).await.unwrap();
        assert_eq!(inbound.body, InboundBody::Empty);
        assert_eq!(inbound.path_and_query, "/");
    }

    #[test]
    fn test_request_id_ext() {
        let mut headers = HeaderMap::new();
        assert_eq!(headers.request_id(), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(headers.request_id(), "abc-123");
    }
}

//! Response rendering.
//!
//! # Responsibilities
//! - Turn a relayed upstream response into an axum response
//! - Render each relay failure with its own status and body shape
//!
//! # Design Decisions
//! - Loop prevention: plain-text 404
//! - Timeout: human-readable HTML 504 naming the attempted target
//! - Transport failures: JSON 500 `{error, message, target, timestamp}`
//! - Content-Length is recomputed from the final body

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::request::InboundRejection;
use crate::proxy::{ProxyError, RelayedResponse};

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// JSON body for upstream transport failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub target: String,
    pub timestamp: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ProxyError::LoopPrevented { .. } => (status, "Not Found").into_response(),
            ProxyError::Timeout { target, timeout } => {
                let page = timeout_page(target, timeout.as_secs());
                (
                    status,
                    [(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
                    page,
                )
                    .into_response()
            }
            ProxyError::Unreachable { target, .. } | ProxyError::Transport { target, .. } => {
                let body = ErrorBody {
                    error: self.kind(),
                    message: self.to_string(),
                    target: target.clone(),
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl IntoResponse for InboundRejection {
    fn into_response(self) -> Response {
        let status = match self {
            InboundRejection::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            InboundRejection::Unreadable(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

fn timeout_page(target: &str, secs: u64) -> String {
    let target = escape_html(target);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>504 Gateway Timeout</title></head>\n\
         <body>\n\
         <h1>Gateway Timeout</h1>\n\
         <p>The application did not respond within {secs} seconds.</p>\n\
         <p>Attempted: <code>{target}</code></p>\n\
         <p>Please try again in a moment.</p>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_loop_prevented_is_plain_404() {
        let response = ProxyError::LoopPrevented { path: "/_relay".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Not Found");
    }

    #[tokio::test]
    async fn test_timeout_page_names_target() {
        let response = ProxyError::Timeout {
            target: "https://app.example.net/relatorio?a=<b>".into(),
            timeout: Duration::from_secs(25),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        let page = body_text(response).await;
        assert!(page.contains("https://app.example.net/relatorio?a=&lt;b&gt;"));
        assert!(page.contains("25 seconds"));
    }

    #[tokio::test]
    async fn test_unreachable_is_json_500() {
        let response = ProxyError::Unreachable {
            target: "https://app.example.net/".into(),
            message: "connection refused".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"], "upstream_unreachable");
        assert_eq!(json["target"], "https://app.example.net/");
        assert!(json["message"].as_str().unwrap().contains("connection refused"));
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_relayed_response_keeps_status_and_headers() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        let response = RelayedResponse {
            status: StatusCode::IM_A_TEAPOT,
            headers,
            body: bytes::Bytes::from_static(b"\x89PNG"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, Response, StatusCode},
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;

use origin_relay::config::ProxyConfig;
use origin_relay::proxy::{ForwardingSettings, InboundBody, InboundRequest, Origin};
use origin_relay::{HttpServer, Shutdown};

/// Public origin used by every test.
pub const PUBLIC_ORIGIN: &str = "https://www.example.com";

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the mock upstream answers.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: StatusCode,
    headers: Vec<(&'static str, String)>,
    body: Bytes,
    delay: Duration,
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: Vec::new(),
            body: Bytes::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok() -> Self {
        Self::status(200)
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A programmable upstream that records every request it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_upstream<F>(reply: F) -> MockUpstream
where
    F: Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    let recorded = calls.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let recorded = recorded.clone();
        let reply = reply.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let request = RecordedRequest {
                method: parts.method,
                path_and_query: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string()),
                headers: parts.headers,
                body,
            };
            let answer = reply(&request);
            recorded.lock().unwrap().push(request);

            if !answer.delay.is_zero() {
                tokio::time::sleep(answer.delay).await;
            }

            let mut response = Response::builder().status(answer.status);
            for (name, value) in &answer.headers {
                response = response.header(*name, value.as_str());
            }
            response.body(Body::from(answer.body)).unwrap()
        }
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    upstream_with(addr, calls)
}

fn upstream_with(addr: SocketAddr, calls: Arc<Mutex<Vec<RecordedRequest>>>) -> MockUpstream {
    MockUpstream { addr, calls }
}

/// An origin nothing listens on.
pub async fn closed_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Default settings relaying `upstream_origin` to [`PUBLIC_ORIGIN`].
pub fn settings_for(upstream_origin: &str) -> ForwardingSettings {
    let mut settings = ForwardingSettings::new(
        Origin::parse(upstream_origin).unwrap(),
        Origin::parse(PUBLIC_ORIGIN).unwrap(),
    );
    settings.upstream_timeout = Duration::from_secs(5);
    settings
}

/// A GET with no body from a fixed client address.
pub fn get(path_and_query: &str) -> InboundRequest {
    InboundRequest {
        method: Method::GET,
        path_and_query: path_and_query.to_string(),
        headers: HeaderMap::new(),
        body: InboundBody::Empty,
        client_addr: "203.0.113.7:40000".parse().unwrap(),
    }
}

/// Start the full HTTP server on an ephemeral port.
pub async fn start_relay(config: ProxyConfig, settings: ForwardingSettings) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::with_settings(config, settings).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// A test client that neither follows redirects nor uses system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

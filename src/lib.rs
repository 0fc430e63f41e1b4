//! Origin relay library.
//!
//! Forwards every request on a public origin to one fixed upstream origin and
//! rewrites upstream URLs in HTML and redirects back to the public origin.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ForwardingProxy, ForwardingSettings};

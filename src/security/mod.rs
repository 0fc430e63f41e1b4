//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound headers → headers.rs (allow-list, Host, X-Forwarded-For) → upstream
//! Upstream headers → headers.rs (drop framing/hop-by-hop/HSTS) → caller
//! ```
//!
//! Body size limits are enforced while the inbound body is read (http::request).

pub mod headers;

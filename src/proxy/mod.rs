//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forwarder.rs (loop prevention, projection, one upstream exchange)
//!     → target.rs (upstream origin + path)
//!     → rewrite.rs (Location and HTML rewrite by content class)
//!     → RelayedResponse | ProxyError
//! ```
//!
//! # Design Decisions
//! - One outbound request per inbound request: no retries, no fan-out
//! - No state across requests; the upstream origin is fixed at startup
//! - Binary bodies are never decoded

pub mod error;
pub mod forwarder;
pub mod rewrite;
pub mod target;

pub use error::{BuildError, ProxyError};
pub use forwarder::{ForwardingProxy, ForwardingSettings, InboundBody, InboundRequest, RelayedResponse};
pub use rewrite::{ContentClass, OriginRewriter};
pub use target::{Origin, OriginError};

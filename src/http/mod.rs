//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, concurrency limit)
//!     → request.rs (buffer body, build InboundRequest)
//!     → proxy::ForwardingProxy::handle
//!     → response.rs (relayed response or failure page)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{read_inbound, InboundRejection, MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

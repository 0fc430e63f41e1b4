//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler produces:
//!     → logging.rs (one structured event per request)
//!     → metrics.rs (counter + latency histogram)
//! tower-http TraceLayer adds a span per request carrying x-request-id.
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows to the upstream and back to the caller
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;

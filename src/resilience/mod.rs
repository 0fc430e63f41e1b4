//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline over send + body read)
//!     → On expiry: in-flight call dropped, Timeout outcome
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: exactly one upstream attempt per inbound request

pub mod timeouts;

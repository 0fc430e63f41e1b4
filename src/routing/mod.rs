//! Routing subsystem.
//!
//! There is a single route: everything goes upstream, except the reserved
//! namespace, which is answered locally with 404 so that a misconfigured
//! public URL cannot make the relay forward to itself.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → matcher.rs (reserved namespace?)
//!     → yes: 404, no upstream call
//!     → no: forwarded
//! ```

pub mod matcher;

pub use matcher::ReservedNamespace;

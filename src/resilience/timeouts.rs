//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap the upstream exchange with a deadline
//! - Cancel the in-flight operation when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the call
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("deadline of {limit:?} exceeded")]
pub struct DeadlineExceeded {
    pub limit: Duration,
}

/// Run `fut` for at most `limit`.
pub async fn within<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded { limit })
}

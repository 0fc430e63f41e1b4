//! Failure taxonomy of the relay.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::proxy::target::OriginError;

/// Why a request was not relayed.
///
/// An upstream 4xx/5xx is not an error: it is relayed like any other response.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request targeted the relay's own namespace.
    #[error("path `{path}` is reserved and never forwarded")]
    LoopPrevented { path: String },

    /// The upstream did not answer within the deadline.
    #[error("upstream did not respond within {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    /// DNS, connect or TLS failure.
    #[error("upstream unreachable: {message}")]
    Unreachable { target: String, message: String },

    /// Any other failure while talking to the upstream.
    #[error("upstream transport error: {message}")]
    Transport { target: String, message: String },
}

impl ProxyError {
    /// Classify a client error for `target`.
    pub fn from_reqwest(target: &str, timeout: Duration, err: reqwest::Error) -> Self {
        let target = target.to_string();
        let message = error_chain(&err);
        if err.is_timeout() {
            ProxyError::Timeout { target, timeout }
        } else if err.is_connect() {
            ProxyError::Unreachable { target, message }
        } else {
            ProxyError::Transport { target, message }
        }
    }

    /// Status code rendered to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::LoopPrevented { .. } => StatusCode::NOT_FOUND,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Unreachable { .. } | ProxyError::Transport { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::LoopPrevented { .. } => "loop_prevented",
            ProxyError::Timeout { .. } => "upstream_timeout",
            ProxyError::Unreachable { .. } => "upstream_unreachable",
            ProxyError::Transport { .. } => "transport_error",
        }
    }

    /// Upstream URL the relay attempted, if it got that far.
    pub fn target(&self) -> Option<&str> {
        match self {
            ProxyError::LoopPrevented { .. } => None,
            ProxyError::Timeout { target, .. }
            | ProxyError::Unreachable { target, .. }
            | ProxyError::Transport { target, .. } => Some(target),
        }
    }
}

// reqwest's Display stops at the outermost layer ("error sending request").
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors building the relay from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid {field}: {source}")]
    Origin {
        field: &'static str,
        #[source]
        source: OriginError,
    },

    #[error("invalid header configuration: {0}")]
    Header(String),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

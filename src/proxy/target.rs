//! Origins and upstream target resolution.
//!
//! An [`Origin`] is `scheme://host[:port]` with no trailing slash. The
//! upstream origin is fixed at startup; every request path is appended to
//! it verbatim.

use thiserror::Error;
use url::Url;

/// Reasons a configured origin is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("`{0}` is not an absolute URL: {1}")]
    Parse(String, String),

    #[error("`{0}` must use http or https")]
    Scheme(String),

    #[error("`{0}` has no host")]
    NoHost(String),

    #[error("`{0}` must not carry a path, query, fragment or credentials")]
    NotBare(String),
}

/// A validated `http`/`https` origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    serialized: String,
}

impl Origin {
    /// Parse an origin, tolerating a single trailing slash.
    pub fn parse(raw: &str) -> Result<Self, OriginError> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| OriginError::Parse(raw.to_string(), e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(OriginError::Scheme(raw.to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| OriginError::NoHost(raw.to_string()))?;
        if url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
            || url.password().is_some()
        {
            return Err(OriginError::NotBare(raw.to_string()));
        }

        // `port()` is None for the scheme's default port.
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            serialized: format!("{}://{}", url.scheme(), authority),
        })
    }

    /// `scheme://host[:port]`, as it appears in absolute URLs.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Absolute URL for `path_and_query` on this origin.
    ///
    /// The path is kept verbatim; an empty path becomes `/`.
    pub fn resolve(&self, path_and_query: &str) -> String {
        if path_and_query.is_empty() {
            format!("{}/", self.serialized)
        } else if path_and_query.starts_with('/') {
            format!("{}{}", self.serialized, path_and_query)
        } else {
            format!("{}/{}", self.serialized, path_and_query)
        }
    }

    /// Whether `url` points at this origin (scheme, host and port).
    pub fn same_origin(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let serialized = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };
        serialized == self.serialized
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialized)
    }
}

//! Reserved namespace matching.
//!
//! # Responsibilities
//! - Decide whether a request path falls inside the relay's own namespace
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Matching is per path segment: `/_relay` covers `/_relay/x`, not `/_relayed`
//! - The query string never takes part in matching
//! - No regex to guarantee O(n) matching

/// A path prefix that must never be forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedNamespace {
    prefix: String,
}

impl ReservedNamespace {
    /// Create a matcher for `prefix`; a trailing `/` is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    /// The normalized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` (optionally carrying a query) is inside the namespace.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or("");
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

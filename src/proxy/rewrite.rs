//! Upstream → public origin rewriting.
//!
//! # Responsibilities
//! - Classify response bodies by `Content-Type`
//! - Replace every literal occurrence of the upstream origin in HTML
//! - Rewrite absolute redirect targets that point at the upstream
//!
//! # Design Decisions
//! - Plain literal replacement, no HTML parsing
//! - Binary and non-UTF-8 bodies are never decoded
//! - Relative `Location` values pass through untouched

use std::borrow::Cow;

use bytes::Bytes;

use crate::proxy::target::Origin;

/// How a response body is treated on its way back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// `text/html`: decoded and rewritten.
    Html,
    /// `application/json`: relayed verbatim.
    Json,
    /// Anything else, including a missing content-type: raw bytes.
    Opaque,
}

impl ContentClass {
    /// Classify from the raw `Content-Type` header value.
    pub fn of(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return ContentClass::Opaque;
        };
        let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "text/html" => ContentClass::Html,
            "application/json" => ContentClass::Json,
            _ => ContentClass::Opaque,
        }
    }
}

/// Replaces the upstream origin with the public origin.
#[derive(Debug, Clone)]
pub struct OriginRewriter {
    upstream: Origin,
    public: Origin,
}

impl OriginRewriter {
    pub fn new(upstream: Origin, public: Origin) -> Self {
        Self { upstream, public }
    }

    /// Rewrite an HTML body.
    ///
    /// Returns the body unchanged when it is not valid UTF-8.
    pub fn rewrite_html(&self, body: Bytes) -> Bytes {
        match std::str::from_utf8(&body) {
            Ok(text) => match self.rewrite_text(text) {
                Cow::Borrowed(_) => body,
                Cow::Owned(rewritten) => Bytes::from(rewritten),
            },
            Err(_) => {
                tracing::warn!("HTML body is not valid UTF-8; relaying without rewrite");
                body
            }
        }
    }

    /// Replace every literal occurrence of the upstream origin.
    pub fn rewrite_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.contains(self.upstream.as_str()) {
            Cow::Owned(text.replace(self.upstream.as_str(), self.public.as_str()))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Rewrite a redirect target.
    ///
    /// Only absolute URLs on the upstream origin are rewritten; the origin
    /// must be followed by the end of the value, `/`, `?` or `#`, so
    /// `https://app.example.net.evil` is left alone.
    pub fn rewrite_location<'a>(&self, location: &'a str) -> Cow<'a, str> {
        let Some(rest) = location.strip_prefix(self.upstream.as_str()) else {
            return Cow::Borrowed(location);
        };
        match rest.chars().next() {
            None | Some('/') | Some('?') | Some('#') => {
                Cow::Owned(format!("{}{}", self.public.as_str(), rest))
            }
            Some(_) => Cow::Borrowed(location),
        }
    }
}

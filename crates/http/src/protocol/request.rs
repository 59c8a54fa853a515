//! Parsed request head handling.
//!
//! Wraps the standard `http::Request` type so the decoder and the engine can
//! pass a bodyless head around and interrogate it without committing to a
//! body representation.

use http::header::{CONNECTION, EXPECT};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The head of a parsed HTTP request: method, target, version and headers.
#[derive(Debug)]
pub struct RequestHead {
    inner: Request<()>,
}

impl RequestHead {
    /// Consumes the head and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the request target.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the HTTP version, `HTTP_10` or `HTTP_11`.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the requester asked for an interim `100 Continue` before
    /// sending its body.
    pub fn expects_continue(&self) -> bool {
        match self.inner.headers().get(EXPECT) {
            Some(value) => value.as_bytes().eq_ignore_ascii_case(b"100-continue"),
            None => false,
        }
    }

    /// The keep-alive disposition the request itself asks for.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `connection: close` is present;
    /// HTTP/1.0 defaults to close unless `connection: keep-alive` is present.
    pub fn keep_alive(&self) -> bool {
        match self.version() {
            Version::HTTP_11 => !connection_header_contains(self.headers(), "close"),
            _ => connection_header_contains(self.headers(), "keep-alive"),
        }
    }
}

/// Checks whether any `connection` header value carries the given token,
/// comparing case-insensitively and splitting on commas.
pub(crate) fn connection_header_contains(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .any(|candidate| candidate.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHead {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

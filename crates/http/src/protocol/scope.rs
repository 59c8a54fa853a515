//! The immutable per-request descriptor handed to the application.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Version};
use percent_encoding::percent_decode;

use crate::protocol::RequestHead;

/// The URI scheme the request arrived over, derived from the transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP
    Http,
    /// TLS
    Https,
}

impl Scheme {
    /// Returns the scheme as it appears in a URI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Everything the application gets to know about a request up front.
///
/// Header names are lowercased by construction (`http::HeaderName`), values
/// are byte-exact as received. The path is percent-decoded; `raw_path` keeps
/// the bytes as they appeared in the request line.
#[derive(Debug)]
pub struct Scope {
    method: Method,
    version: Version,
    scheme: Scheme,
    path: String,
    raw_path: Bytes,
    query_string: Bytes,
    headers: HeaderMap,
    client: Option<SocketAddr>,
    server: Option<SocketAddr>,
}

impl Scope {
    pub(crate) fn new(
        head: &RequestHead,
        scheme: Scheme,
        client: Option<SocketAddr>,
        server: Option<SocketAddr>,
    ) -> Self {
        let raw_path = Bytes::copy_from_slice(head.uri().path().as_bytes());
        let query_string = head
            .uri()
            .query()
            .map(|query| Bytes::copy_from_slice(query.as_bytes()))
            .unwrap_or_default();
        Self {
            method: head.method().clone(),
            version: head.version(),
            scheme,
            path: percent_decode(&raw_path).decode_utf8_lossy().into_owned(),
            raw_path,
            query_string,
            headers: head.headers().clone(),
            client,
            server,
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the HTTP version, `HTTP_10` or `HTTP_11`.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the HTTP version in its wire spelling, `"1.0"` or `"1.1"`.
    pub fn http_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_10 => "1.0",
            _ => "1.1",
        }
    }

    /// Returns the scheme the request arrived over.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the percent-decoded request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the path bytes as they appeared on the wire.
    pub fn raw_path(&self) -> &Bytes {
        &self.raw_path
    }

    /// Returns the query string bytes, empty if the target had none.
    pub fn query_string(&self) -> &Bytes {
        &self.query_string
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the peer address, if the transport knows it.
    pub fn client(&self) -> Option<SocketAddr> {
        self.client
    }

    /// Returns the local address, if the transport knows it.
    pub fn server(&self) -> Option<SocketAddr> {
        self.server
    }
}

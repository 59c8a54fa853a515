//! Response head representation.

use http::{HeaderMap, StatusCode};

/// The finalized head of a response, ready for serialization.
///
/// Produced by the response writer after the keep-alive and framing
/// decisions have been applied to the application-provided headers.
#[derive(Debug)]
pub struct ResponseHead {
    /// Response status code
    pub status: StatusCode,
    /// Complete header block, including injected headers
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a head from a status and a header block.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }
}

//! Error types for the protocol engine.
//!
//! Two families cover the two directions of the wire: [`ParseError`] for
//! inbound request parsing, [`SendError`] for outbound response production.
//! [`HttpError`] unifies them at the API boundary. The engine itself never
//! propagates these to the embedder; every failure ends as a synthesized
//! response, a connection closure, or both. [`AppError`] is the boxed error
//! an application task may return.

use std::error::Error;
use std::io;
use thiserror::Error;

/// A boxed error returned by an application task.
pub type AppError = Box<dyn Error + Send + Sync>;

/// Any error the protocol engine can produce.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Errors from request parsing
    #[error("request error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    /// Errors from response production
    #[error("response error: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

/// Errors that occur while parsing an inbound request.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Header section exceeds the maximum allowed size
    #[error("header section too large: {current_size} exceeds the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    /// Number of headers exceeds the maximum allowed
    #[error("header count exceeds the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    /// Malformed header line or request line
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    /// Unsupported HTTP version
    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    /// Invalid or unsupported HTTP method
    #[error("invalid http method")]
    InvalidMethod,

    /// Invalid request target
    #[error("invalid http uri")]
    InvalidUri,

    /// Invalid `content-length` header
    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    /// Invalid request body framing
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// I/O error surfaced during parsing
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    /// Creates a new TooLargeHeader error
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    /// Creates a new TooManyHeaders error
    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    /// Creates a new InvalidHeader error
    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    /// Creates a new InvalidBody error
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    /// Creates a new InvalidContentLength error
    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }
}

/// Errors that occur while producing a response.
///
/// The first group are protocol-misuse faults raised back to the
/// application through its send channel; the rest are framing and
/// connection-state faults detected by the writer.
#[derive(Error, Debug)]
pub enum SendError {
    /// A body message arrived before the response start
    #[error("response body sent before response start")]
    ResponseNotStarted,

    /// A second response start arrived
    #[error("response start sent twice")]
    ResponseAlreadyStarted,

    /// A message arrived after the final body message
    #[error("message sent after response completed")]
    ResponseAlreadyCompleted,

    /// The response head declared both `content-length` and
    /// `transfer-encoding: chunked`
    #[error("content-length and transfer-encoding are mutually exclusive")]
    ConflictingFraming,

    /// The declared `content-length` could not be parsed
    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    /// More body bytes were sent than the declared `content-length`
    #[error("response body exceeds declared content-length {declared}")]
    ContentLengthExceeded { declared: u64 },

    /// The body ended short of the declared `content-length`
    #[error("response body ended at {sent} bytes, declared content-length {declared}")]
    ContentLengthShortfall { declared: u64, sent: u64 },

    /// The transport is gone; remaining output is discarded
    #[error("transport disconnected")]
    Disconnected,

    /// I/O error surfaced while sending
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    /// Creates a new InvalidContentLength error
    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }
}

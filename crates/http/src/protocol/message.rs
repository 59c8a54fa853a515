use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A decoded HTTP message part: either a parsed head or a payload item.
///
/// The incremental request decoder yields the head once per request and then
/// a sequence of payload items for its body. `T` is the head type.
#[derive(Debug)]
pub enum Message<T> {
    /// The parsed head of a message
    Header(T),
    /// A chunk of payload data or the end-of-payload marker
    Payload(PayloadItem),
}

/// One item of a message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of payload data
    Chunk(Bytes),
    /// End of the payload stream
    Eof,
}

impl<T> Message<T> {
    /// Returns true if this message is a payload item
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message is a parsed head
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl PayloadItem {
    /// Returns true if this item marks the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns the contained bytes if this item is a chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// Size information for a request payload, derived from its headers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with a known length in bytes (`content-length`)
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// No payload
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if there is no payload
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

/// How a response body is delimited on the wire.
///
/// Decided once per response when its head is written, from the response
/// headers and the keep-alive policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Exactly this many body bytes follow the head (`content-length`)
    Length(u64),
    /// Chunked transfer encoding
    Chunked,
    /// Body runs until the connection closes
    CloseDelimited,
}

/// A message delivered to the application through its receive channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMessage {
    /// A piece of the request body. `more` is false on the final piece,
    /// whose `data` is then empty.
    Body {
        /// Body bytes, possibly empty
        data: Bytes,
        /// Whether further body messages follow
        more: bool,
    },
    /// The transport is gone, or the response already completed. Once
    /// yielded, every later receive yields it again.
    Disconnect,
}

impl RequestMessage {
    pub(crate) fn body(data: Bytes) -> Self {
        RequestMessage::Body { data, more: true }
    }

    pub(crate) fn end() -> Self {
        RequestMessage::Body { data: Bytes::new(), more: false }
    }

    /// Returns true if this message is the disconnect sentinel
    #[inline]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RequestMessage::Disconnect)
    }
}

/// A message the application submits through its send channel.
///
/// The engine accepts exactly one `Start` first, then one or more `Body`
/// messages; a `Body` with `more: false` terminates the response.
#[derive(Debug, Clone)]
pub enum ResponseMessage {
    /// The response head
    Start {
        /// Response status code
        status: StatusCode,
        /// Response headers as provided by the application
        headers: HeaderMap,
    },
    /// A piece of the response body
    Body {
        /// Body bytes, possibly empty
        data: Bytes,
        /// Whether further body messages follow
        more: bool,
    },
}

impl ResponseMessage {
    /// Bytes this message contributes to a cycle's outbound buffer accounting
    pub(crate) fn buffered_len(&self) -> usize {
        match self {
            ResponseMessage::Start { .. } => 0,
            ResponseMessage::Body { data, .. } => data.len(),
        }
    }
}

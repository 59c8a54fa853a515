//! Unified response body encoder.
//!
//! Wraps the three framing strategies behind one type so the response
//! writer can hold a single encoder per in-flight response.

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{Framing, PayloadItem, SendError};

/// Encodes a response body under the framing the writer decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    CloseDelimited { finished: bool, head_only: bool },
}

impl PayloadEncoder {
    /// Creates an encoder for the given framing. `head_only` suppresses all
    /// body bytes on the wire while keeping the accounting (HEAD responses).
    pub fn new(framing: Framing, head_only: bool) -> Self {
        let kind = match framing {
            Framing::Length(declared) => Kind::Length(LengthEncoder::new(declared, head_only)),
            Framing::Chunked => Kind::Chunked(ChunkedEncoder::new(head_only)),
            Framing::CloseDelimited => Kind::CloseDelimited { finished: false, head_only },
        };
        Self { kind }
    }

    /// Whether the final payload item has been accepted.
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finished(),
            Kind::Chunked(encoder) => encoder.is_finished(),
            Kind::CloseDelimited { finished, .. } => *finished,
        }
    }

    /// Whether completing this body requires closing the connection.
    pub fn closes_connection(&self) -> bool {
        matches!(self.kind, Kind::CloseDelimited { .. })
    }
}

impl Encoder<PayloadItem> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::CloseDelimited { finished, head_only } => {
                match item {
                    PayloadItem::Chunk(bytes) => {
                        if !*head_only {
                            dst.extend_from_slice(&bytes[..]);
                        }
                    }
                    PayloadItem::Eof => *finished = true,
                }
                Ok(())
            }
        }
    }
}

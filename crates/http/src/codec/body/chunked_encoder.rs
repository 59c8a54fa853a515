//! Encoder for response bodies using chunked transfer encoding
//! ([RFC 7230 §4.1](https://tools.ietf.org/html/rfc7230#section-4.1)).

use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};

/// Encodes body items as size-prefixed chunks, terminated by `0\r\n\r\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    finished: bool,
    /// Suppress all wire bytes (HEAD responses)
    head_only: bool,
}

impl ChunkedEncoder {
    pub fn new(head_only: bool) -> Self {
        Self { finished: false, head_only }
    }

    /// Whether the terminating chunk has been accepted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Encoder<PayloadItem> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.finished {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                // an empty chunk would read as the terminator
                if bytes.is_empty() || self.head_only {
                    return Ok(());
                }
                write!(Writer(dst), "{:X}\r\n", bytes.len()).map_err(SendError::from)?;
                dst.reserve(bytes.len() + 2);
                dst.extend_from_slice(&bytes[..]);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof => {
                self.finished = true;
                if !self.head_only {
                    dst.extend_from_slice(b"0\r\n\r\n");
                }
                Ok(())
            }
        }
    }
}

struct Writer<'a>(&'a mut BytesMut);

impl Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

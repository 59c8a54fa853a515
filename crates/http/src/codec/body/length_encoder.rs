//! Encoder for response bodies delimited by `content-length`.
//!
//! The declared length is a contract: producing more bytes than declared, or
//! terminating short of it, is a fatal framing violation surfaced as an
//! error so the connection can be torn down instead of desynchronizing the
//! peer.

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};

/// Encodes a body with an exact declared length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    declared: u64,
    sent: u64,
    finished: bool,
    /// Suppress body bytes on the wire (HEAD responses) while still
    /// enforcing the length accounting
    head_only: bool,
}

impl LengthEncoder {
    pub fn new(declared: u64, head_only: bool) -> Self {
        Self { declared, sent: 0, finished: false, head_only }
    }

    /// Whether the final payload item has been accepted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Encoder<PayloadItem> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if bytes.is_empty() {
                    return Ok(());
                }
                let sent = self.sent + bytes.len() as u64;
                if sent > self.declared {
                    return Err(SendError::ContentLengthExceeded { declared: self.declared });
                }
                self.sent = sent;
                if sent == self.declared {
                    self.finished = true;
                }
                if !self.head_only {
                    dst.extend_from_slice(&bytes[..]);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                if self.sent != self.declared {
                    return Err(SendError::ContentLengthShortfall { declared: self.declared, sent: self.sent });
                }
                self.finished = true;
                Ok(())
            }
        }
    }
}

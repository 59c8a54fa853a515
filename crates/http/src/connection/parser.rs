//! Parser adapter: push-based facade over the incremental request decoder.
//!
//! The engine feeds raw transport bytes in and drains decoded events out.
//! The adapter owns the accumulation buffer and the decoder state machine,
//! and latches the first parse error: once failed it produces no further
//! events, whatever is fed to it.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::RequestDecoder;
use crate::protocol::{Message, ParseError, PayloadSize, RequestHead};

pub(crate) struct RequestParser {
    decoder: RequestDecoder,
    buffer: BytesMut,
    failed: bool,
}

impl RequestParser {
    pub(crate) fn new() -> Self {
        Self { decoder: RequestDecoder::new(), buffer: BytesMut::with_capacity(8 * 1024), failed: false }
    }

    /// Appends transport bytes to the accumulation buffer.
    pub(crate) fn feed(&mut self, data: &[u8]) {
        if !self.failed {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Produces the next decoded event, `None` when more bytes are needed.
    ///
    /// The first error latches the adapter into its terminal state.
    pub(crate) fn next_event(&mut self) -> Result<Option<Message<(RequestHead, PayloadSize)>>, ParseError> {
        if self.failed {
            return Ok(None);
        }
        match self.decoder.decode(&mut self.buffer) {
            Ok(event) => Ok(event),
            Err(e) => {
                self.failed = true;
                self.buffer.clear();
                Err(e)
            }
        }
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed
    }
}

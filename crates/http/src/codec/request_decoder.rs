//! Streaming HTTP request decoder.
//!
//! Coordinates the two decoding phases behind a single
//! `tokio_util::codec::Decoder`. The decoder is an explicit two-phase state
//! machine: in the head phase the buffer is fed to [`HeaderDecoder`]; a
//! parsed head moves it into the body phase, where the [`PayloadDecoder`]
//! matching the declared framing consumes the body until its end-of-payload
//! marker flips the machine back to the head phase. A single buffer may
//! therefore yield many messages, including several complete pipelined
//! requests.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadSize, RequestHead};

/// Where the decoder stands in the request stream: between requests the
/// next bytes form a head, within a request they belong to its body.
#[derive(Debug)]
enum Phase {
    Head,
    Body(PayloadDecoder),
}

/// Decoder producing request heads interleaved with their payload items.
#[derive(Debug)]
pub struct RequestDecoder {
    phase: Phase,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { phase: Phase::Head }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.phase {
            Phase::Head => {
                let Some((head, payload_size)) = HeaderDecoder.decode(src)? else {
                    return Ok(None);
                };
                self.phase = Phase::Body(payload_size.into());
                Ok(Some(Message::Header((head, payload_size))))
            }
            Phase::Body(payload_decoder) => {
                let Some(item) = payload_decoder.decode(src)? else {
                    return Ok(None);
                };
                if item.is_eof() {
                    self.phase = Phase::Head;
                }
                Ok(Some(Message::Payload(item)))
            }
        }
    }
}

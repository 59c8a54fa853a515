//! Decoder for request bodies using chunked transfer encoding
//! ([RFC 7230 §4.1](https://tools.ietf.org/html/rfc7230#section-4.1)).
//!
//! Each chunk carries its size in hexadecimal, optionally followed by
//! extensions, then CRLF, the data, and a trailing CRLF. A zero-sized chunk
//! ends the body; trailer fields after it are consumed and discarded.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

/// Incremental decoder for a chunked body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    /// Bytes of the current chunk not yet produced
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading the chunk size in hex
    Size,
    /// Skipping a chunk extension up to CR
    Extension,
    /// Expecting LF after the chunk size line CR
    SizeLf,
    /// Reading chunk data
    Data,
    /// Expecting CR after chunk data
    DataCr,
    /// Expecting LF after chunk data
    DataLf,
    /// At the start of a trailer line
    Trailer,
    /// Skipping a trailer line up to CR
    TrailerData,
    /// Expecting LF ending a trailer line
    TrailerLf,
    /// Expecting the final LF
    EndLf,
    /// Body fully decoded
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, remaining: 0 }
    }

    fn take_byte(src: &mut BytesMut) -> Option<u8> {
        if src.is_empty() { None } else { Some(src.get_u8()) }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == State::Done {
                return Ok(Some(PayloadItem::Eof));
            }

            if self.state == State::Data {
                if src.is_empty() {
                    return Ok(None);
                }
                let len = std::cmp::min(self.remaining, src.len() as u64);
                let bytes = src.split_to(len as usize).freeze();
                self.remaining -= bytes.len() as u64;
                if self.remaining == 0 {
                    self.state = State::DataCr;
                }
                trace!(len = bytes.len(), "decoded chunk data");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }

            let Some(byte) = Self::take_byte(src) else {
                return Ok(None);
            };

            self.state = match (self.state, byte) {
                (State::Size, b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') => {
                    let digit = (byte as char).to_digit(16).unwrap_or(0) as u64;
                    self.remaining = self
                        .remaining
                        .checked_mul(16)
                        .and_then(|size| size.checked_add(digit))
                        .ok_or_else(|| ParseError::invalid_body("chunk size overflows u64"))?;
                    State::Size
                }
                (State::Size, b';') => State::Extension,
                (State::Size, b'\r') => State::SizeLf,
                (State::Size, _) => {
                    return Err(ParseError::invalid_body("invalid chunk size character"));
                }

                (State::Extension, b'\r') => State::SizeLf,
                (State::Extension, _) => State::Extension,

                (State::SizeLf, b'\n') if self.remaining > 0 => State::Data,
                (State::SizeLf, b'\n') => State::Trailer,
                (State::SizeLf, _) => {
                    return Err(ParseError::invalid_body("chunk size line missing lf"));
                }

                (State::DataCr, b'\r') => State::DataLf,
                (State::DataCr, _) => {
                    return Err(ParseError::invalid_body("chunk data missing cr"));
                }
                (State::DataLf, b'\n') => State::Size,
                (State::DataLf, _) => {
                    return Err(ParseError::invalid_body("chunk data missing lf"));
                }

                (State::Trailer, b'\r') => State::EndLf,
                (State::Trailer, _) => State::TrailerData,
                (State::TrailerData, b'\r') => State::TrailerLf,
                (State::TrailerData, _) => State::TrailerData,
                (State::TrailerLf, b'\n') => State::Trailer,
                (State::TrailerLf, _) => {
                    return Err(ParseError::invalid_body("trailer line missing lf"));
                }

                (State::EndLf, b'\n') => State::Done,
                (State::EndLf, _) => {
                    return Err(ParseError::invalid_body("chunked body missing final lf"));
                }

                (State::Data | State::Done, _) => unreachable!("handled above"),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut ChunkedDecoder, src: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut collected = Vec::new();
        loop {
            match decoder.decode(src).unwrap() {
                Some(PayloadItem::Chunk(bytes)) => collected.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => return (collected, true),
                None => return (collected, false),
            }
        }
    }

    #[test]
    fn two_chunks_and_terminator() {
        let mut src = BytesMut::from(&b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (collected, finished) = drain(&mut decoder, &mut src);
        assert!(finished);
        assert_eq!(&collected[..], b"Wikipedia");
    }

    #[test]
    fn split_across_feeds() {
        let mut decoder = ChunkedDecoder::new();

        let mut src = BytesMut::from(&b"6\r\nhel"[..]);
        let (collected, finished) = drain(&mut decoder, &mut src);
        assert!(!finished);
        assert_eq!(&collected[..], b"hel");

        let mut src = BytesMut::from(&b"lo!\r\n0\r\n\r\n"[..]);
        let (collected, finished) = drain(&mut decoder, &mut src);
        assert!(finished);
        assert_eq!(&collected[..], b"lo!");
    }

    #[test]
    fn extension_and_trailers_are_skipped() {
        let mut src =
            BytesMut::from(&b"3;name=value\r\nabc\r\n0\r\nExpires: never\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (collected, finished) = drain(&mut decoder, &mut src);
        assert!(finished);
        assert_eq!(&collected[..], b"abc");
    }

    #[test]
    fn rejects_bad_size_character() {
        let mut src = BytesMut::from(&b"zz\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut src).is_err());
    }

    #[test]
    fn eof_repeats_after_done() {
        let mut src = BytesMut::from(&b"0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.decode(&mut src).unwrap().unwrap().is_eof());
        assert!(decoder.decode(&mut src).unwrap().unwrap().is_eof());
    }
}

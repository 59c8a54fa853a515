//! Decoder for request bodies delimited by `content-length`.

use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

/// Decodes a body with a known remaining length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// Bytes of the payload not yet produced
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.remaining -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_declared_length() {
        let mut buffer = BytesMut::from(&b"1012345678rest"[..]);
        let mut decoder = LengthDecoder::new(10);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap();
        assert_eq!(&chunk[..], b"1012345678");
        assert_eq!(&buffer[..], b"rest");

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn waits_for_more_data() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = LengthDecoder::new(10);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap();
        assert_eq!(&chunk[..], b"abc");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }
}

//! Response head serializer.
//!
//! Writes the status line and header block of a finalized [`ResponseHead`]
//! into a byte buffer. The status line is always spelled `HTTP/1.1`
//! regardless of the request version; HTTP/1.0 clients tolerate it, and the
//! keep-alive decision is carried by the `connection` header instead.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{ResponseHead, SendError};

/// Initial buffer size reserved for head serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for the response status line and header block.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<ResponseHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);

        write!(
            FastWrite(dst),
            "HTTP/1.1 {} {}\r\n",
            head.status.as_str(),
            head.status.canonical_reason().unwrap_or("Unknown")
        )
        .map_err(SendError::from)?;

        for (name, value) in head.headers.iter() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writer over `BytesMut` so the status line can use `write!` formatting.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, StatusCode, header};

    #[test]
    fn serializes_status_line_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));

        let mut dst = BytesMut::new();
        HeaderEncoder.encode(ResponseHead::new(StatusCode::OK, headers), &mut dst).unwrap();

        let text = String::from_utf8(dst.to_vec()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-type: text/plain\r\n"));
        assert!(text.contains("content-length: 12\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn serializes_status_without_body_headers() {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(ResponseHead::new(StatusCode::NO_CONTENT, HeaderMap::new()), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 204 No Content\r\n\r\n");
    }
}

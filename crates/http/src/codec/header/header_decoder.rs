//! Request head decoder built on `httparse`.
//!
//! Parses the request line and header block from raw bytes into a
//! [`RequestHead`] and determines the payload framing from the
//! `content-length` and `transfer-encoding` headers. The decoder is strictly
//! incremental: it consumes nothing from the buffer until a complete head is
//! available, and a buffer that grows past the header size limit without
//! completing is a parse error (which is what turns an endless stream of
//! garbage into a `400` instead of an unbounded buffer).
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header section size: 8 KiB
//! - HTTP/1.0 and HTTP/1.1 only

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Request};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the request line plus header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for the request line and header block.
#[derive(Debug)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut parsed = httparse::Request::new(&mut headers);

        let status = parsed.parse(src).map_err(|e| match e {
            httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match parsed.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            // HTTP/2 and HTTP/3 heads never reach this decoder
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let mut builder = Request::builder()
            .method(parsed.method.ok_or(ParseError::InvalidMethod)?)
            .uri(parsed.path.ok_or(ParseError::InvalidUri)?)
            .version(version);

        let header_map = builder.headers_mut().ok_or(ParseError::InvalidUri)?;
        header_map.reserve(parsed.headers.len());
        for header in parsed.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|e| ParseError::invalid_header(e.to_string()))?;
            let value = HeaderValue::from_bytes(header.value)
                .map_err(|e| ParseError::invalid_header(e.to_string()))?;
            header_map.append(name, value);
        }

        let head = RequestHead::from(builder.body(()).map_err(|e| ParseError::invalid_header(e.to_string()))?);
        let payload_size = parse_payload(&head)?;

        let _ = src.split_to(body_offset);
        Ok(Some((head, payload_size)))
    }
}

/// Determines the request payload framing per RFC 7230 §3.3.
///
/// `transfer-encoding` and `content-length` together are malformed; a
/// `transfer-encoding` whose final coding is not `chunked` leaves the body
/// length undeterminable and is rejected the same way.
fn parse_payload(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::Chunked)
            } else {
                Err(ParseError::invalid_body("transfer-encoding without a final chunked coding"))
            }
        }

        (None, Some(cl_value)) => {
            let cl_str =
                cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;
            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
            Ok(PayloadSize::Length(length))
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer-encoding and content-length both present"))
        }
    }
}

/// Whether the final transfer coding is `chunked` (RFC 7230 requires chunked
/// to be last when present).
pub(crate) fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, Version};
    use indoc::indoc;

    #[test]
    fn check_is_chunked() {
        {
            let headers = HeaderMap::new();
            assert!(!is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
            assert!(is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
            assert!(!is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }
    }

    #[test]
    fn consumes_exactly_the_head() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let mut bytes = BytesMut::from(str);
        let result = HeaderDecoder.decode(&mut bytes).unwrap();

        assert!(result.is_some());
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);
        let (head, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.uri().path(), "/index.html");
        assert_eq!(head.uri().query(), None);
        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers().get(http::header::HOST).unwrap(), "127.0.0.1:8080");
        assert_eq!(head.headers().get(http::header::USER_AGENT).unwrap(), "curl/7.79.1");
    }

    #[test]
    fn http10_version_and_query() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2 HTTP/1.0
        Host: 127.0.0.1:8080

        "##};

        let mut buf = BytesMut::from(str);
        let (head, _) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.version(), Version::HTTP_10);
        assert_eq!(head.uri().path(), "/index/");
        assert_eq!(head.uri().query(), Some("a=1&b=2"));
    }

    #[test]
    fn partial_head_needs_more_data() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: exam");
        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 26);
    }

    #[test]
    fn content_length_framing() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 18\r\n\r\n");
        let (_, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(payload_size, PayloadSize::Length(18));
    }

    #[test]
    fn chunked_framing() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
        let (_, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        assert!(payload_size.is_chunked());
    }

    #[test]
    fn conflicting_framing_is_rejected() {
        let mut buf =
            BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n");
        assert!(matches!(
            HeaderDecoder.decode(&mut buf),
            Err(ParseError::InvalidContentLength { .. })
        ));
    }

    #[test]
    fn unbounded_garbage_is_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'x'; 100_000]);
        assert!(matches!(
            HeaderDecoder.decode(&mut buf),
            Err(ParseError::TooLargeHeader { .. })
        ));
    }
}

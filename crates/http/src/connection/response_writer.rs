//! Response serialization for the cycle at the pipeline head.
//!
//! The writer settles the keep-alive policy and the body framing when a
//! response head goes out, then streams body items through the matching
//! payload encoder. Everything is encoded into one scratch buffer and
//! handed to the transport in a single `write` per message, so a failed
//! encode leaves no partial bytes on the wire.

use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, StatusCode, Version};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::{HeaderEncoder, is_chunked};
use crate::connection::cycle::{Cycle, WireState};
use crate::protocol::{
    Framing, PayloadItem, ResponseHead, ResponseMessage, SendError, connection_header_contains,
};
use crate::transport::Transport;

pub(crate) struct ResponseWriter {
    header_encoder: HeaderEncoder,
    scratch: BytesMut,
    server_header: Option<HeaderValue>,
}

impl ResponseWriter {
    pub(crate) fn new(server_header: Option<HeaderValue>) -> Self {
        Self { header_encoder: HeaderEncoder, scratch: BytesMut::with_capacity(4 * 1024), server_header }
    }

    /// Writes a response head, deciding keep-alive and framing.
    ///
    /// `force_close` is the connection-level must-close flag; the request's
    /// own keep-alive disposition and a `connection: close` response header
    /// can each also drop keep-alive. The decision is recorded on the cycle.
    pub(crate) fn write_start(
        &mut self,
        cycle: &mut Cycle,
        transport: &mut dyn Transport,
        status: StatusCode,
        mut headers: HeaderMap,
        force_close: bool,
    ) -> Result<(), SendError> {
        let mut close =
            force_close || !cycle.request_keep_alive || connection_header_contains(&headers, "close");

        let declared_length = match headers.get(CONTENT_LENGTH) {
            Some(value) => Some(parse_content_length(value)?),
            None => None,
        };

        let framing = if let Some(declared) = declared_length {
            Framing::Length(declared)
        } else if is_chunked(headers.get(TRANSFER_ENCODING)) {
            Framing::Chunked
        } else if !close && cycle.version == Version::HTTP_11 {
            headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            Framing::Chunked
        } else {
            // no length information and no chunking: the body runs until
            // the connection closes
            close = true;
            Framing::CloseDelimited
        };

        if close {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        } else if cycle.version == Version::HTTP_10 {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        if let Some(server) = &self.server_header {
            if !headers.contains_key(SERVER) {
                headers.insert(SERVER, server.clone());
            }
        }
        if !headers.contains_key(DATE) {
            if let Ok(date) = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now())) {
                headers.insert(DATE, date);
            }
        }

        cycle.keep_alive = !close;
        trace!(status = %status, ?framing, keep_alive = cycle.keep_alive, "writing response head");

        self.scratch.clear();
        self.header_encoder.encode(ResponseHead::new(status, headers), &mut self.scratch)?;
        transport.write(&self.scratch);

        cycle.wire = WireState::Streaming(PayloadEncoder::new(framing, cycle.head_only));
        Ok(())
    }

    /// Writes a body message. Returns true once the response is complete.
    pub(crate) fn write_body(
        &mut self,
        cycle: &mut Cycle,
        transport: &mut dyn Transport,
        data: Bytes,
        more: bool,
    ) -> Result<bool, SendError> {
        let WireState::Streaming(encoder) = &mut cycle.wire else {
            return Err(SendError::ResponseNotStarted);
        };

        self.scratch.clear();
        encoder.encode(PayloadItem::Chunk(data), &mut self.scratch)?;
        if !more {
            encoder.encode(PayloadItem::Eof, &mut self.scratch)?;
        }
        transport.write(&self.scratch);

        if !more {
            if encoder.closes_connection() {
                cycle.keep_alive = false;
            }
            cycle.wire = WireState::Complete;
            return Ok(true);
        }
        Ok(false)
    }

    /// Writes a complete minimal response directly, outside any cycle.
    ///
    /// Used for the parse-error `400` when the pipeline is idle.
    pub(crate) fn write_error_response(&mut self, transport: &mut dyn Transport, status: StatusCode) {
        let (message, body) = synthesized_response(status);
        if let ResponseMessage::Start { status, mut headers } = message {
            if let Some(server) = &self.server_header {
                headers.insert(SERVER, server.clone());
            }
            if let Ok(date) = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now())) {
                headers.insert(DATE, date);
            }
            self.scratch.clear();
            if self.header_encoder.encode(ResponseHead::new(status, headers), &mut self.scratch).is_ok() {
                if let ResponseMessage::Body { data, .. } = body {
                    self.scratch.extend_from_slice(&data[..]);
                }
                transport.write(&self.scratch);
            }
        }
    }

    /// Writes the interim `100 Continue` line.
    pub(crate) fn write_continue(&mut self, transport: &mut dyn Transport) {
        transport.write(b"HTTP/1.1 100 Continue\r\n\r\n");
    }
}

fn parse_content_length(value: &HeaderValue) -> Result<u64, SendError> {
    let text = value.to_str().map_err(|_| SendError::invalid_content_length("value is not visible ascii"))?;
    text.trim().parse::<u64>().map_err(|_| SendError::invalid_content_length(format!("value {text} is not u64")))
}

/// Builds the start/body message pair of a synthesized plain-text response
/// (`500 Internal Server Error`, `400 Bad Request`). The pair is routed
/// through the ordinary outbound path so pipeline ordering holds even when
/// the failing cycle is not at the head.
pub(crate) fn synthesized_response(status: StatusCode) -> (ResponseMessage, ResponseMessage) {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = Bytes::from_static(reason.as_bytes());

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    (ResponseMessage::Start { status, headers }, ResponseMessage::Body { data: body, more: false })
}

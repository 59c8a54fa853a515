//! One request/response pair and the state that travels with it.
//!
//! A cycle is created when a request head parses and removed from the
//! pipeline head once its response is fully on the wire (or the connection
//! is torn down). It carries two queues — inbound body messages awaiting
//! the application, outbound response messages awaiting the writer — and
//! two small state machines: what the application has submitted
//! (`SendState`) and what has actually been written (`WireState`). The two
//! diverge whenever the cycle is not at the pipeline head, because
//! submitted messages are then buffered instead of written.

use std::collections::VecDeque;
use std::sync::Arc;

use http::Version;
use tokio::sync::Notify;

use crate::codec::body::PayloadEncoder;
use crate::protocol::{RequestHead, RequestMessage, ResponseMessage, SendError};

/// What the application has submitted through its send channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SendState {
    /// Nothing submitted yet
    Idle,
    /// Response start submitted
    Started,
    /// Final body message submitted
    Finished,
}

/// What has been written to the transport for this cycle.
pub(crate) enum WireState {
    /// Head not yet written
    WaitingStart,
    /// Head written; body streaming through the encoder
    Streaming(PayloadEncoder),
    /// Response fully written
    Complete,
}

impl WireState {
    pub(crate) fn is_waiting_start(&self) -> bool {
        matches!(self, WireState::WaitingStart)
    }
}

pub(crate) struct Cycle {
    pub(crate) id: u64,
    pub(crate) version: Version,
    /// HEAD requests get a full head but no body bytes on the wire
    pub(crate) head_only: bool,
    /// Keep-alive disposition the request asked for
    pub(crate) request_keep_alive: bool,
    /// Final keep-alive decision, settled when the response head is written
    pub(crate) keep_alive: bool,

    pub(crate) inbound: VecDeque<RequestMessage>,
    pub(crate) inbound_bytes: usize,
    /// End-of-message reached; the queue will not grow again
    pub(crate) inbound_done: bool,
    /// The request body was cut off (client half-close mid-body); receive
    /// yields the disconnect sentinel
    pub(crate) inbound_interrupted: bool,

    pub(crate) send_state: SendState,
    pub(crate) wire: WireState,
    pub(crate) outbound: VecDeque<ResponseMessage>,
    pub(crate) outbound_bytes: usize,

    pub(crate) recv_wake: Arc<Notify>,
    pub(crate) send_wake: Arc<Notify>,
}

impl Cycle {
    pub(crate) fn new(id: u64, head: &RequestHead) -> Self {
        let request_keep_alive = head.keep_alive();
        Self {
            id,
            version: head.version(),
            head_only: head.method() == &http::Method::HEAD,
            request_keep_alive,
            keep_alive: request_keep_alive,
            inbound: VecDeque::new(),
            inbound_bytes: 0,
            inbound_done: false,
            inbound_interrupted: false,
            send_state: SendState::Idle,
            wire: WireState::WaitingStart,
            outbound: VecDeque::new(),
            outbound_bytes: 0,
            recv_wake: Arc::new(Notify::new()),
            send_wake: Arc::new(Notify::new()),
        }
    }

    /// Checks a submitted message against the send-order contract without
    /// consuming it.
    pub(crate) fn validate(&self, message: &ResponseMessage) -> Result<(), SendError> {
        match (message, self.send_state) {
            (ResponseMessage::Start { headers, .. }, SendState::Idle) => validate_start_headers(headers),
            (ResponseMessage::Start { .. }, _) => Err(SendError::ResponseAlreadyStarted),
            (ResponseMessage::Body { .. }, SendState::Idle) => Err(SendError::ResponseNotStarted),
            (ResponseMessage::Body { .. }, SendState::Started) => Ok(()),
            (ResponseMessage::Body { .. }, SendState::Finished) => Err(SendError::ResponseAlreadyCompleted),
        }
    }

    /// Accepts a validated message into the outbound buffer, advancing the
    /// send-side state machine.
    pub(crate) fn accept(&mut self, message: ResponseMessage) {
        match &message {
            ResponseMessage::Start { .. } => self.send_state = SendState::Started,
            ResponseMessage::Body { more: false, .. } => self.send_state = SendState::Finished,
            ResponseMessage::Body { .. } => {}
        }
        self.outbound_bytes += message.buffered_len();
        self.outbound.push_back(message);
    }

    /// Replaces whatever the application produced with a synthesized
    /// response, marking the cycle finished and its connection doomed.
    pub(crate) fn preempt_with(&mut self, start: ResponseMessage, body: ResponseMessage) {
        self.outbound.clear();
        self.outbound_bytes = 0;
        self.send_state = SendState::Idle;
        self.accept(start);
        self.accept(body);
        self.keep_alive = false;
    }

    /// Queues an inbound body message for the application.
    pub(crate) fn push_inbound(&mut self, message: RequestMessage) {
        if let RequestMessage::Body { data, more } = &message {
            self.inbound_bytes += data.len();
            if !more {
                self.inbound_done = true;
            }
        }
        self.inbound.push_back(message);
        self.recv_wake.notify_one();
    }
}

/// Response heads may declare at most one of `content-length` and
/// `transfer-encoding: chunked`, and a declared length must parse.
fn validate_start_headers(headers: &http::HeaderMap) -> Result<(), SendError> {
    let has_chunked = crate::codec::header::is_chunked(headers.get(http::header::TRANSFER_ENCODING));
    match headers.get(http::header::CONTENT_LENGTH) {
        Some(value) => {
            if has_chunked {
                return Err(SendError::ConflictingFraming);
            }
            let text = value.to_str().map_err(|_| SendError::invalid_content_length("value is not visible ascii"))?;
            text.trim()
                .parse::<u64>()
                .map(|_| ())
                .map_err(|_| SendError::invalid_content_length(format!("value {text} is not u64")))
        }
        None => Ok(()),
    }
}

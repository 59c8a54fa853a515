//! The per-connection engine and its lifecycle callbacks.
//!
//! `HttpConnection` glues the four other collaborators together around one
//! piece of shared state: the transport callbacks mutate it from the event
//! loop side, application tasks mutate it through their receive/send
//! channels, and the state lock is only ever held across non-awaiting
//! sections, so the two sides interleave cooperatively.
//!
//! The control flow worth knowing:
//!
//! - `data_received` drains the parser and may create cycles; application
//!   tasks are spawned after the lock is released, so a read pause caused
//!   by queued body bytes is observable before any application code runs.
//! - All response output funnels through [`Inner::service_writer`], which
//!   serializes messages strictly from the pipeline head and promotes the
//!   next cycle (flushing its buffered output) when the head completes.
//! - Failures converge on two sinks: [`Inner::fail_cycle`] replaces a
//!   cycle's output with a synthesized response when nothing for it is on
//!   the wire yet, and [`Inner::shutdown`] tears the connection down.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::{StatusCode, Version};
use tokio::sync::Notify;
use tracing::{debug, error, trace, warn};

use crate::app::{Application, RequestReceiver, ResponseSender};
use crate::connection::ConnectionConfig;
use crate::connection::cycle::{Cycle, SendState};
use crate::connection::flow_control::FlowControl;
use crate::connection::parser::RequestParser;
use crate::connection::response_writer::{ResponseWriter, synthesized_response};
use crate::protocol::{
    AppError, Message, ParseError, PayloadItem, RequestHead, RequestMessage, ResponseMessage, Scheme, Scope,
    SendError,
};
use crate::transport::Transport;

/// The protocol engine for one accepted connection.
///
/// Constructing it is the `connection_made` moment; the embedder then feeds
/// transport events into [`data_received`], [`eof_received`],
/// [`connection_lost`] and the writability callbacks. One application task
/// is spawned per parsed request; responses reach the transport strictly in
/// request order.
///
/// [`data_received`]: HttpConnection::data_received
/// [`eof_received`]: HttpConnection::eof_received
/// [`connection_lost`]: HttpConnection::connection_lost
pub struct HttpConnection<A> {
    app: Arc<A>,
    state: Arc<ConnectionState>,
}

impl<A> fmt::Debug for HttpConnection<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection").finish_non_exhaustive()
    }
}

/// Engine state shared between the transport side and application tasks.
pub(crate) struct ConnectionState {
    inner: Mutex<Inner>,
}

impl ConnectionState {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of asking for the next inbound message.
pub(crate) enum RecvStep {
    Ready(RequestMessage),
    Pending,
}

/// Outcome of submitting an outbound message.
pub(crate) enum SendStep {
    Accepted,
    /// Backpressured; the message is handed back for a retry after the
    /// cycle's send waker fires
    Blocked(ResponseMessage),
    Rejected(SendError),
}

/// Everything a spawned application task needs, captured while the state
/// lock is held.
struct Launch {
    scope: Scope,
    cycle_id: u64,
    recv_wake: Arc<Notify>,
    send_wake: Arc<Notify>,
}

pub(crate) struct Inner {
    transport: Box<dyn Transport>,
    config: ConnectionConfig,
    parser: RequestParser,
    writer: ResponseWriter,
    pipeline: VecDeque<Cycle>,
    next_cycle_id: u64,
    /// Cycle the parser is currently delivering body messages to
    receiving: Option<u64>,
    flow: FlowControl,
    /// Close once the head-of-pipeline response completes
    must_close: bool,
    /// Client half-closed; drain the pipeline, then close
    eof: bool,
    /// Transport reported connection loss
    disconnected: bool,
}

impl<A> HttpConnection<A>
where
    A: Application + Send + Sync + 'static,
{
    /// Binds the engine to an accepted transport.
    pub fn new(app: A, transport: impl Transport + 'static, config: ConnectionConfig) -> Self {
        debug!(peer = ?transport.peer_addr(), "connection made");
        let flow = FlowControl::new(config.high_water, config.low_water);
        let writer = ResponseWriter::new(config.server_header.clone());
        let inner = Inner {
            transport: Box::new(transport),
            config,
            parser: RequestParser::new(),
            writer,
            pipeline: VecDeque::new(),
            next_cycle_id: 0,
            receiving: None,
            flow,
            must_close: false,
            eof: false,
            disconnected: false,
        };
        Self { app: Arc::new(app), state: Arc::new(ConnectionState { inner: Mutex::new(inner) }) }
    }

    /// Feeds received transport bytes into the engine.
    ///
    /// Parses as many events as the bytes complete: new requests start
    /// cycles and application tasks, body chunks are queued for their
    /// cycle, and a parse error produces a `400` (when the wire is idle)
    /// and schedules closure. Read-side backpressure is applied before
    /// this call returns.
    pub fn data_received(&self, data: &[u8]) {
        let mut launches = Vec::new();
        {
            let mut inner = self.state.lock();
            if inner.is_down() || inner.eof {
                return;
            }
            if inner.parser.is_failed() {
                trace!(len = data.len(), "discarding bytes after parse failure");
                inner.must_close = true;
                if inner.pipeline.is_empty() {
                    inner.shutdown();
                }
                return;
            }

            inner.parser.feed(data);
            loop {
                match inner.parser.next_event() {
                    Ok(Some(Message::Header((head, _)))) => {
                        launches.push(inner.begin_cycle(&head));
                    }
                    Ok(Some(Message::Payload(PayloadItem::Chunk(chunk)))) => inner.deliver_body(chunk),
                    Ok(Some(Message::Payload(PayloadItem::Eof))) => inner.finish_body(),
                    Ok(None) => break,
                    Err(e) => {
                        inner.on_parse_error(&e);
                        break;
                    }
                }
            }
        }

        for launch in launches {
            self.launch(launch);
        }
    }

    /// Handles the client half-closing its send side.
    ///
    /// The current request body, if incomplete, is terminated with the
    /// disconnect sentinel; no further cycles can start. In-flight
    /// responses drain, then the transport closes. Always returns `false`:
    /// the engine takes responsibility for closing.
    pub fn eof_received(&self) -> bool {
        let mut inner = self.state.lock();
        if inner.is_down() {
            return false;
        }
        debug!("eof received");
        inner.eof = true;
        inner.interrupt_receiving();
        if inner.pipeline.is_empty() {
            inner.shutdown();
        }
        false
    }

    /// Handles the transport reporting connection loss.
    ///
    /// Every outstanding cycle observes the disconnect sentinel on its next
    /// receive; application tasks are not aborted, and their remaining
    /// output is discarded.
    pub fn connection_lost(&self, error: Option<io::Error>) {
        let mut inner = self.state.lock();
        match error {
            Some(e) => debug!(error = %e, "connection lost"),
            None => debug!("connection lost"),
        }
        inner.disconnected = true;
        inner.receiving = None;
        for cycle in &inner.pipeline {
            cycle.recv_wake.notify_one();
            cycle.send_wake.notify_one();
        }
        inner.pipeline.clear();
    }

    /// The transport's send buffer ran full; suspend response writing.
    pub fn pause_writing(&self) {
        self.state.lock().flow.set_write_paused(true);
    }

    /// The transport's send buffer drained; resume response writing.
    pub fn resume_writing(&self) {
        let mut inner = self.state.lock();
        inner.flow.set_write_paused(false);
        if let Some(front) = inner.pipeline.front() {
            front.send_wake.notify_one();
        }
        inner.service_writer();
    }

    fn launch(&self, launch: Launch) {
        let app = Arc::clone(&self.app);
        let state = Arc::clone(&self.state);
        let receiver = RequestReceiver::new(Arc::clone(&state), launch.cycle_id, launch.recv_wake);
        let sender = ResponseSender::new(Arc::clone(&state), launch.cycle_id, launch.send_wake);
        let cycle_id = launch.cycle_id;
        tokio::spawn(async move {
            let result = app.call(launch.scope, receiver, sender).await;
            finish_cycle(&state, cycle_id, result);
        });
    }
}

/// Settles a cycle once its application task returns.
///
/// A task that completed its response needs nothing; every other outcome is
/// one of the fault rows: no start yet means a synthesized `500`, anything
/// after the start means teardown.
fn finish_cycle(state: &ConnectionState, cycle_id: u64, result: Result<(), AppError>) {
    let mut inner = state.lock();
    if inner.is_down() {
        if let Err(e) = result {
            debug!(cycle = cycle_id, error = %e, "application task failed after connection closed");
        }
        return;
    }

    let Some(position) = inner.cycle_position(cycle_id) else {
        // the response is fully on the wire already
        if let Err(e) = result {
            error!(cycle = cycle_id, error = %e, "application failed after completing its response");
            inner.shutdown();
        }
        return;
    };

    let send_state = inner.pipeline[position].send_state;
    match (result, send_state) {
        (Ok(()), SendState::Finished) => {
            // buffered output; the writer completes the cycle on promotion
        }
        (Ok(()), SendState::Idle) => {
            error!(cycle = cycle_id, "application returned without starting a response");
            inner.fail_cycle(cycle_id, StatusCode::INTERNAL_SERVER_ERROR);
        }
        (Ok(()), SendState::Started) => {
            error!(cycle = cycle_id, "application returned mid-response");
            inner.abort_cycle(cycle_id);
        }
        (Err(e), SendState::Idle) => {
            error!(cycle = cycle_id, error = %e, "application failed before starting a response");
            inner.fail_cycle(cycle_id, StatusCode::INTERNAL_SERVER_ERROR);
        }
        (Err(e), _) => {
            error!(cycle = cycle_id, error = %e, "application failed mid-response");
            inner.abort_cycle(cycle_id);
        }
    }
}

impl Inner {
    fn is_down(&self) -> bool {
        self.disconnected || self.transport.is_closing()
    }

    fn cycle_position(&self, cycle_id: u64) -> Option<usize> {
        self.pipeline.iter().position(|cycle| cycle.id == cycle_id)
    }

    /// Creates a cycle for a parsed head and captures what its task needs.
    fn begin_cycle(&mut self, head: &RequestHead) -> Launch {
        if head.expects_continue() && head.version() == Version::HTTP_11 && self.pipeline.is_empty() {
            self.writer.write_continue(self.transport.as_mut());
        }

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;
        debug!(cycle = cycle_id, method = %head.method(), path = head.uri().path(), "request head received");

        let scheme = if self.transport.is_tls() { Scheme::Https } else { Scheme::Http };
        let scope = Scope::new(head, scheme, self.transport.peer_addr(), self.transport.local_addr());

        let cycle = Cycle::new(cycle_id, head);
        let launch = Launch {
            scope,
            cycle_id,
            recv_wake: cycle.recv_wake.clone(),
            send_wake: cycle.send_wake.clone(),
        };
        self.pipeline.push_back(cycle);
        self.receiving = Some(cycle_id);
        launch
    }

    /// Queues a parsed body chunk for the receiving cycle, engaging read
    /// backpressure when the buffered total crosses the high-water mark.
    fn deliver_body(&mut self, data: Bytes) {
        let Some(cycle_id) = self.receiving else {
            trace!(len = data.len(), "discarding unexpected body bytes");
            return;
        };
        let Some(position) = self.cycle_position(cycle_id) else {
            // the response finished before its request body did; keep
            // draining the wire without buffering
            trace!(len = data.len(), "discarding body for completed cycle");
            return;
        };
        let len = data.len();
        self.pipeline[position].push_inbound(RequestMessage::body(data));
        if self.flow.note_queued(len) {
            trace!(len, "read high-water mark crossed, pausing transport reads");
            self.transport.pause_reading();
        }
    }

    fn finish_body(&mut self) {
        if let Some(cycle_id) = self.receiving.take() {
            if let Some(position) = self.cycle_position(cycle_id) {
                self.pipeline[position].push_inbound(RequestMessage::end());
            }
        }
    }

    /// Marks the receiving cycle's body as cut off, waking its reader into
    /// the disconnect sentinel.
    fn interrupt_receiving(&mut self) {
        if let Some(cycle_id) = self.receiving.take() {
            if let Some(position) = self.cycle_position(cycle_id) {
                let cycle = &mut self.pipeline[position];
                if !cycle.inbound_done {
                    cycle.inbound_interrupted = true;
                    cycle.recv_wake.notify_one();
                }
            }
        }
    }

    fn on_parse_error(&mut self, error: &ParseError) {
        error!(error = %error, "request parsing failed");
        self.must_close = true;
        self.interrupt_receiving();
        if self.pipeline.is_empty() {
            self.writer.write_error_response(self.transport.as_mut(), StatusCode::BAD_REQUEST);
            self.shutdown();
        }
    }

    /// Serializes buffered messages from the pipeline head until it runs
    /// out of messages, write backpressure engages, or the connection goes
    /// down. Completing a response pops its cycle and continues with the
    /// promoted one, so pipelined output flushes in one pass.
    fn service_writer(&mut self) {
        loop {
            if self.is_down() || self.flow.write_paused() {
                return;
            }

            let Some(front) = self.pipeline.front_mut() else {
                return;
            };
            let Some(message) = front.outbound.pop_front() else {
                return;
            };
            front.outbound_bytes -= message.buffered_len();
            front.send_wake.notify_one();

            let force_close = self.must_close || self.eof;
            let written = {
                let Inner { pipeline, writer, transport, .. } = self;
                let Some(front) = pipeline.front_mut() else {
                    return;
                };
                match message {
                    ResponseMessage::Start { status, headers } => {
                        writer.write_start(front, transport.as_mut(), status, headers, force_close).map(|()| false)
                    }
                    ResponseMessage::Body { data, more } => {
                        writer.write_body(front, transport.as_mut(), data, more)
                    }
                }
            };

            match written {
                Ok(false) => {}
                Ok(true) => {
                    if !self.finish_front() {
                        return;
                    }
                }
                Err(e) => {
                    error!(error = %e, "response serialization failed, tearing down connection");
                    self.shutdown();
                    return;
                }
            }
        }
    }

    /// Pops the completed head cycle and decides what happens next.
    /// Returns false when the connection closed.
    fn finish_front(&mut self) -> bool {
        let Some(cycle) = self.pipeline.pop_front() else {
            return false;
        };
        debug!(cycle = cycle.id, "response complete");

        // unread body bytes no longer hold the read side back
        if self.flow.note_drained(cycle.inbound_bytes) {
            self.transport.resume_reading();
        }
        cycle.recv_wake.notify_one();
        cycle.send_wake.notify_one();

        if !cycle.keep_alive {
            self.must_close = true;
        }
        if self.must_close || (self.eof && self.pipeline.is_empty()) {
            self.shutdown();
            return false;
        }
        true
    }

    /// Replaces a cycle's output with a synthesized response. Ordering is
    /// preserved: the synthesized messages travel the ordinary outbound
    /// path, so a non-head cycle emits them only once promoted.
    fn fail_cycle(&mut self, cycle_id: u64, status: StatusCode) {
        let Some(position) = self.cycle_position(cycle_id) else {
            return;
        };
        warn!(cycle = cycle_id, status = %status, "synthesizing error response");
        let (start, body) = synthesized_response(status);
        self.pipeline[position].preempt_with(start, body);
        if position == 0 {
            self.service_writer();
        }
    }

    /// Gives up on a cycle whose response can no longer be completed:
    /// synthesize when nothing for it is on the wire, otherwise tear down.
    fn abort_cycle(&mut self, cycle_id: u64) {
        let Some(position) = self.cycle_position(cycle_id) else {
            return;
        };
        if self.pipeline[position].wire.is_waiting_start() {
            self.fail_cycle(cycle_id, StatusCode::INTERNAL_SERVER_ERROR);
        } else {
            self.shutdown();
        }
    }

    /// Closes the transport and discards every remaining cycle. Parked
    /// receivers and senders wake into the disconnect sentinel.
    fn shutdown(&mut self) {
        if !self.transport.is_closing() {
            debug!("closing transport");
            self.transport.close();
        }
        for cycle in &self.pipeline {
            cycle.recv_wake.notify_one();
            cycle.send_wake.notify_one();
        }
        self.pipeline.clear();
        self.receiving = None;
    }

    /// Receive-side step for one cycle, called from its task.
    pub(crate) fn next_request_message(&mut self, cycle_id: u64) -> RecvStep {
        if self.is_down() {
            return RecvStep::Ready(RequestMessage::Disconnect);
        }
        let Some(position) = self.cycle_position(cycle_id) else {
            // response complete; reads past that observe the sentinel
            return RecvStep::Ready(RequestMessage::Disconnect);
        };

        let popped = {
            let cycle = &mut self.pipeline[position];
            if cycle.inbound_interrupted {
                return RecvStep::Ready(RequestMessage::Disconnect);
            }
            match cycle.inbound.pop_front() {
                Some(message) => {
                    if let RequestMessage::Body { data, .. } = &message {
                        cycle.inbound_bytes -= data.len();
                    }
                    Some(message)
                }
                None => None,
            }
        };

        match popped {
            Some(message) => {
                if let RequestMessage::Body { data, .. } = &message {
                    if self.flow.note_drained(data.len()) {
                        trace!("read low-water mark reached, resuming transport reads");
                        self.transport.resume_reading();
                    }
                }
                RecvStep::Ready(message)
            }
            None => RecvStep::Pending,
        }
    }

    /// Send-side step for one cycle, called from its task.
    pub(crate) fn submit_response_message(&mut self, cycle_id: u64, message: ResponseMessage) -> SendStep {
        if self.is_down() {
            return SendStep::Rejected(SendError::Disconnected);
        }
        let Some(position) = self.cycle_position(cycle_id) else {
            // the response already completed; a further message forfeits
            // the connection
            warn!(cycle = cycle_id, "message sent after response completed");
            self.shutdown();
            return SendStep::Rejected(SendError::ResponseAlreadyCompleted);
        };

        if let Err(violation) = self.pipeline[position].validate(&message) {
            return self.handle_violation(cycle_id, violation);
        }

        let at_head = position == 0;
        let blocked = if at_head {
            self.flow.write_paused()
        } else {
            self.pipeline[position].outbound_bytes >= self.config.outbound_buffer_limit
        };
        if blocked {
            return SendStep::Blocked(message);
        }

        self.pipeline[position].accept(message);
        if at_head {
            self.service_writer();
        }
        SendStep::Accepted
    }

    fn handle_violation(&mut self, cycle_id: u64, violation: SendError) -> SendStep {
        error!(cycle = cycle_id, error = %violation, "application violated the response message order");
        self.abort_cycle(cycle_id);
        SendStep::Rejected(violation)
    }
}

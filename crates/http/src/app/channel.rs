//! The receive/send channel halves handed to each application task.
//!
//! Both halves talk to the shared connection state under its lock and park
//! on their cycle's waker when they cannot make progress, which makes the
//! application task suspend exactly at the points the engine controls: an
//! empty body queue on the receive side, write backpressure or a full
//! outbound buffer on the send side.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::sync::Notify;

use crate::connection::{ConnectionState, RecvStep, SendStep};
use crate::protocol::{RequestMessage, ResponseMessage, SendError};

/// The receive half: yields the request body for one cycle.
///
/// Messages arrive in wire order and end with a `Body { more: false }`.
/// After the transport is gone or the cycle's response has completed, every
/// call yields [`RequestMessage::Disconnect`].
pub struct RequestReceiver {
    state: Arc<ConnectionState>,
    cycle_id: u64,
    wake: Arc<Notify>,
}

impl RequestReceiver {
    pub(crate) fn new(state: Arc<ConnectionState>, cycle_id: u64, wake: Arc<Notify>) -> Self {
        Self { state, cycle_id, wake }
    }

    /// Returns the next inbound message, waiting while the queue is empty.
    pub async fn recv(&mut self) -> RequestMessage {
        loop {
            let step = self.state.lock().next_request_message(self.cycle_id);
            match step {
                RecvStep::Ready(message) => return message,
                RecvStep::Pending => self.wake.notified().await,
            }
        }
    }
}

impl fmt::Debug for RequestReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestReceiver").field("cycle", &self.cycle_id).finish()
    }
}

/// The send half: accepts the response for one cycle.
///
/// The engine enforces the message order — one `Start`, then body messages
/// until `more: false` — and raises a [`SendError`] on violations. A send
/// suspends while the transport is write-paused (for the cycle at the
/// pipeline head) or while the cycle's outbound buffer is full (behind the
/// head). After a disconnect every send fails with
/// [`SendError::Disconnected`]; the application may propagate or ignore it.
pub struct ResponseSender {
    state: Arc<ConnectionState>,
    cycle_id: u64,
    wake: Arc<Notify>,
}

impl ResponseSender {
    pub(crate) fn new(state: Arc<ConnectionState>, cycle_id: u64, wake: Arc<Notify>) -> Self {
        Self { state, cycle_id, wake }
    }

    /// Submits one response message, waiting while backpressured.
    pub async fn send(&mut self, message: ResponseMessage) -> Result<(), SendError> {
        let mut message = message;
        loop {
            let step = self.state.lock().submit_response_message(self.cycle_id, message);
            match step {
                SendStep::Accepted => return Ok(()),
                SendStep::Rejected(error) => return Err(error),
                SendStep::Blocked(returned) => {
                    message = returned;
                    self.wake.notified().await;
                }
            }
        }
    }

    /// Sends the response head.
    pub async fn send_start(&mut self, status: StatusCode, headers: HeaderMap) -> Result<(), SendError> {
        self.send(ResponseMessage::Start { status, headers }).await
    }

    /// Sends a piece of the response body; `more: false` terminates the
    /// response.
    pub async fn send_body(&mut self, data: impl Into<Bytes>, more: bool) -> Result<(), SendError> {
        self.send(ResponseMessage::Body { data: data.into(), more }).await
    }
}

impl fmt::Debug for ResponseSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSender").field("cycle", &self.cycle_id).finish()
    }
}

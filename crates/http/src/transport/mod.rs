//! The byte-oriented transport abstraction the engine drives.
//!
//! A `Transport` is one accepted TCP or TLS connection as seen from the
//! protocol engine: an append-only send buffer, a close switch, read
//! pause/resume knobs for inbound backpressure, and a little connection
//! metadata. The engine never reads from it; inbound bytes are pushed into
//! the engine by the embedder through the lifecycle callbacks.
//!
//! Writes are fire-and-forget: `write` appends to the transport's send
//! buffer and must not block. When the embedder's send buffer runs full it
//! reports that through the engine's `pause_writing`/`resume_writing`
//! callbacks rather than through this trait.

use std::fmt::Debug;
use std::net::SocketAddr;

/// One accepted connection, as consumed by the protocol engine.
pub trait Transport: Debug + Send {
    /// Appends bytes to the send buffer. Must not block.
    fn write(&mut self, data: &[u8]);

    /// Closes the send side. Buffered bytes are still flushed by the
    /// embedder; no further writes will follow.
    fn close(&mut self);

    /// Whether the transport is closed or closing.
    fn is_closing(&self) -> bool;

    /// Stops delivering inbound bytes until [`resume_reading`] is called.
    ///
    /// [`resume_reading`]: Transport::resume_reading
    fn pause_reading(&mut self);

    /// Resumes delivering inbound bytes.
    fn resume_reading(&mut self);

    /// The peer address, if known.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// The local address, if known.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Whether the connection carries TLS; decides the request scheme.
    fn is_tls(&self) -> bool {
        false
    }
}

//! The per-connection protocol engine.
//!
//! One [`HttpConnection`] is created per accepted transport. The embedder
//! feeds it transport events (`data_received`, `eof_received`,
//! `connection_lost`, `pause_writing`, `resume_writing`); the engine parses
//! requests incrementally, keeps an ordered pipeline of request/response
//! cycles, runs one application task per cycle, and serializes responses
//! strictly from the head of the pipeline.
//!
//! # Components
//!
//! - [`HttpConnection`]: lifecycle callbacks and the shared engine state
//! - [`ConnectionConfig`]: watermarks, buffer bounds, server header
//! - parser adapter: wraps the incremental request decoder with a terminal
//!   error state
//! - cycle: per-request state (inbound queue, outbound buffer, response
//!   state machine)
//! - response writer: keep-alive and framing decisions, head and body
//!   serialization
//! - flow control: read-side watermarks and the write-pause flag

mod config;
pub use config::ConnectionConfig;

mod cycle;
mod flow_control;
mod parser;
mod response_writer;

mod http_connection;
pub use http_connection::HttpConnection;
pub(crate) use http_connection::{ConnectionState, RecvStep, SendStep};

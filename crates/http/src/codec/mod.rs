//! Incremental HTTP/1.x decoding and encoding.
//!
//! Decoding is split in two phases coordinated by [`RequestDecoder`]: the
//! header phase ([`header::HeaderDecoder`]) parses the request line and
//! header block, then the payload phase ([`body::PayloadDecoder`]) consumes
//! the body according to the framing the headers declared. Encoding mirrors
//! it: [`header::HeaderEncoder`] serializes a finalized response head and
//! [`body::PayloadEncoder`] serializes body items under fixed-length,
//! chunked or close-delimited framing.
//!
//! All codecs implement `tokio_util::codec::{Decoder, Encoder}` over
//! `bytes::BytesMut`; the connection engine drives them directly from its
//! transport callbacks.

pub mod body;
pub mod header;

mod request_decoder;
pub use request_decoder::RequestDecoder;

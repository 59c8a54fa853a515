//! Body-phase codecs.
//!
//! Decoders consume a request body according to the framing its headers
//! declared: [`length_decoder::LengthDecoder`] for `content-length`,
//! [`chunked_decoder::ChunkedDecoder`] for chunked transfer encoding, with
//! [`PayloadDecoder`] selecting between them (or producing an immediate end
//! for bodiless requests).
//!
//! Encoders produce a response body under the framing the writer decided:
//! fixed-length (with exact-length enforcement), chunked, or
//! close-delimited, unified behind [`PayloadEncoder`].

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;

//! Header-phase codecs: request head parsing and response head serialization.

mod header_decoder;
pub use header_decoder::HeaderDecoder;
pub(crate) use header_decoder::is_chunked;

mod header_encoder;
pub use header_encoder::HeaderEncoder;

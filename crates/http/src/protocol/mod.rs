//! Core protocol abstractions shared by the codec and the connection engine.
//!
//! The module splits into:
//!
//! - **Codec-side messages** ([`message`]): [`Message`], [`PayloadItem`] and
//!   [`PayloadSize`] describe what the incremental decoder produces, and
//!   [`Framing`] describes how a response body is delimited on the wire.
//! - **Application-side messages** ([`message`]): [`RequestMessage`] flows
//!   from the engine to the application, [`ResponseMessage`] flows back.
//! - **Request descriptor** ([`request`], [`scope`]): [`RequestHead`] wraps
//!   the parsed head; [`Scope`] is the immutable per-request view handed to
//!   the application.
//! - **Errors** ([`error`]): [`ParseError`] and [`SendError`] under the
//!   [`HttpError`] umbrella, plus the boxed [`AppError`] the application
//!   returns.

mod message;
pub use message::Framing;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;
pub use message::RequestMessage;
pub use message::ResponseMessage;

mod request;
pub use request::RequestHead;
pub(crate) use request::connection_header_contains;

mod response;
pub use response::ResponseHead;

mod scope;
pub use scope::Scheme;
pub use scope::Scope;

mod error;
pub use error::AppError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

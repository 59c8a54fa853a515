//! The application boundary.
//!
//! An application is an asynchronous callable invoked once per request with
//! the request [`Scope`] and the two channel halves: [`RequestReceiver`]
//! yields the request body (and eventually the disconnect sentinel), and
//! [`ResponseSender`] accepts the response start followed by its body.
//!
//! Two callable shapes are supported, mirroring how such engines are
//! embedded: the single-stage form takes `(scope, receiver, sender)` in one
//! call ([`app_fn`]), and the two-stage form first builds a handler from the
//! scope and then runs it ([`factory_fn`]). Both are adapters over the one
//! [`Application`] trait.
//!
//! # Examples
//!
//! ```no_run
//! use aqueduct_http::app::app_fn;
//! use bytes::Bytes;
//! use http::{HeaderMap, StatusCode};
//!
//! let app = app_fn(|_scope, _receiver, mut sender| async move {
//!     sender.send_start(StatusCode::OK, HeaderMap::new()).await?;
//!     sender.send_body(Bytes::from_static(b"Hello, world"), false).await?;
//!     Ok(())
//! });
//! # let _ = app;
//! ```

use std::future::Future;

use crate::protocol::{AppError, Scope};

mod channel;
pub use channel::RequestReceiver;
pub use channel::ResponseSender;

/// An asynchronous request handler invoked once per cycle.
///
/// The task must send exactly one response start followed by one or more
/// body messages ending with `more: false`; returning without doing so, or
/// returning an error, makes the engine synthesize a `500` or tear the
/// connection down depending on what already reached the wire.
#[trait_variant::make(Application: Send)]
pub trait LocalApplication: Sync {
    async fn call(
        &self,
        scope: Scope,
        receiver: RequestReceiver,
        sender: ResponseSender,
    ) -> Result<(), AppError>;
}

/// Single-stage function adapter; see [`app_fn`].
#[derive(Debug)]
pub struct AppFn<F> {
    f: F,
}

impl<F, Fut> Application for AppFn<F>
where
    F: Fn(Scope, RequestReceiver, ResponseSender) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AppError>> + Send,
{
    async fn call(
        &self,
        scope: Scope,
        receiver: RequestReceiver,
        sender: ResponseSender,
    ) -> Result<(), AppError> {
        (self.f)(scope, receiver, sender).await
    }
}

/// Wraps a `(scope, receiver, sender)` async function as an [`Application`].
pub fn app_fn<F, Fut>(f: F) -> AppFn<F>
where
    F: Fn(Scope, RequestReceiver, ResponseSender) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AppError>> + Send,
{
    AppFn { f }
}

/// Two-stage factory adapter; see [`factory_fn`].
#[derive(Debug)]
pub struct FactoryFn<F> {
    f: F,
}

impl<F, H, Fut> Application for FactoryFn<F>
where
    F: Fn(Scope) -> Result<H, AppError> + Send + Sync,
    H: FnOnce(RequestReceiver, ResponseSender) -> Fut + Send,
    Fut: Future<Output = Result<(), AppError>> + Send,
{
    async fn call(
        &self,
        scope: Scope,
        receiver: RequestReceiver,
        sender: ResponseSender,
    ) -> Result<(), AppError> {
        let handler = (self.f)(scope)?;
        handler(receiver, sender).await
    }
}

/// Wraps a `scope -> handler` factory as an [`Application`].
///
/// The factory runs before any response bytes exist, so a factory error
/// always synthesizes a clean `500`.
pub fn factory_fn<F, H, Fut>(f: F) -> FactoryFn<F>
where
    F: Fn(Scope) -> Result<H, AppError> + Send + Sync,
    H: FnOnce(RequestReceiver, ResponseSender) -> Fut + Send,
    Fut: Future<Output = Result<(), AppError>> + Send,
{
    FactoryFn { f }
}

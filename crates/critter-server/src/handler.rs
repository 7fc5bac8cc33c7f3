//! Handler types and failure classification.
//!
//! A route binds to one of two handler kinds:
//!
//! - **HTTP** handlers take a fully buffered [`Request`] and produce a
//!   [`Response`] or a [`HandlerError`].
//! - **WebSocket** handlers take an upgraded [`WebSocket`] and run for the
//!   lifetime of the connection.
//!
//! Failures are classified two ways. An [`ApplicationError`] carries the
//! status the client should see; anything else is unclassified and becomes
//! a `500`.
//!
//! # Example
//!
//! ```rust
//! use critter_server::{ApplicationError, Handler, Request};
//! use http::StatusCode;
//!
//! let hello = Handler::http(|_req: Request| async { Ok::<_, ApplicationError>("world") });
//! let admin = Handler::http(|_req: Request| async {
//!     Err::<&str, _>(ApplicationError::new(StatusCode::FORBIDDEN, "forbidden"))
//! });
//! assert!(!hello.is_websocket());
//! assert!(!admin.is_websocket());
//! ```

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use critter_router::Captures;
use critter_ws::WebSocket;
use http::{header, HeaderValue, StatusCode};
use thiserror::Error;

/// A fully buffered HTTP request.
pub type Request = http::Request<Bytes>;

/// An HTTP response with a buffered body.
pub type Response = http::Response<Bytes>;

/// Boxed future returned by type-erased handlers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A type-erased HTTP handler.
pub type HttpHandler = Arc<dyn Fn(Request) -> BoxFuture<Result<Response, HandlerError>> + Send + Sync>;

/// A type-erased WebSocket handler.
pub type WebSocketHandler = Arc<dyn Fn(WebSocket) -> BoxFuture<()> + Send + Sync>;

/// Message used when a failure carries no description.
pub const UNHANDLED_EXCEPTION: &str = "unhandled exception";

/// A route's handler.
#[derive(Clone)]
pub enum Handler {
    /// Handles one request and produces one response.
    Http(HttpHandler),
    /// Takes over an upgraded connection.
    WebSocket(WebSocketHandler),
}

impl Handler {
    /// Wraps an async function as an HTTP handler.
    pub fn http<F, Fut, R, E>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<HandlerError>,
    {
        Self::Http(Arc::new(move |request: Request| -> BoxFuture<Result<Response, HandlerError>> {
            let fut = f(request);
            Box::pin(async move { fut.await.map(IntoResponse::into_response).map_err(Into::into) })
        }))
    }

    /// Wraps an async function as a WebSocket handler.
    pub fn websocket<F, Fut>(f: F) -> Self
    where
        F: Fn(WebSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::WebSocket(Arc::new(move |ws: WebSocket| -> BoxFuture<()> { Box::pin(f(ws)) }))
    }

    /// Returns true for WebSocket handlers.
    pub fn is_websocket(&self) -> bool {
        matches!(self, Self::WebSocket(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(_) => f.write_str("Handler::Http"),
            Self::WebSocket(_) => f.write_str("Handler::WebSocket"),
        }
    }
}

/// A deliberate failure that carries the status the client should see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApplicationError {
    status: StatusCode,
    message: String,
}

impl ApplicationError {
    /// Creates an error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// `403 Forbidden`.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response body.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why an HTTP handler did not produce a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A status-carrying failure.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Any other failure. Always answered with `500`.
    #[error("{0}")]
    Unclassified(String),
}

impl HandlerError {
    /// Creates an unclassified failure. An empty message becomes
    /// [`UNHANDLED_EXCEPTION`].
    pub fn unclassified(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Unclassified(UNHANDLED_EXCEPTION.to_string())
        } else {
            Self::Unclassified(message)
        }
    }

    /// The failure used for a panicking handler.
    pub fn unhandled() -> Self {
        Self::Unclassified(UNHANDLED_EXCEPTION.to_string())
    }

    /// Status code the client receives.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Application(e) => e.status(),
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body the client receives.
    pub fn message(&self) -> &str {
        match self {
            Self::Application(e) => e.message(),
            Self::Unclassified(message) => message,
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApplicationError>() {
            Ok(app) => Self::Application(app),
            Err(err) => Self::unclassified(err.to_string()),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::unclassified(err.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::unclassified(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::unclassified(message)
    }
}

impl From<Infallible> for HandlerError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Conversion of handler return values into responses.
pub trait IntoResponse {
    /// Builds the response.
    fn into_response(self) -> Response;
}

fn text_response(body: Bytes, content_type: &'static str) -> Response {
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        text_response(Bytes::from(self), "text/plain; charset=utf-8")
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        text_response(Bytes::from_static(self.as_bytes()), "text/plain; charset=utf-8")
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        text_response(self, "application/octet-stream")
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Bytes::from(self).into_response()
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::new(Bytes::new())
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

/// Capture groups of the matched route, stored in the request extensions.
#[derive(Debug, Clone, Default)]
pub struct PathCaptures(pub Captures);

impl Deref for PathCaptures {
    type Target = Captures;

    fn deref(&self) -> &Captures {
        &self.0
    }
}

/// Accessors the dispatcher adds to requests.
pub trait RequestExt {
    /// Capture groups of the matched route pattern.
    fn captures(&self) -> Option<&Captures>;
}

impl RequestExt for Request {
    fn captures(&self) -> Option<&Captures> {
        self.extensions().get::<PathCaptures>().map(|c| &c.0)
    }
}

//! Embeddable HTTP/WebSocket dispatcher.
//!
//! `critter-server` is linked into a host process. The host binds a
//! [`WebServer`], registers routes and starts it on a pool of worker
//! threads:
//!
//! ```text
//!  WorkerPool ──drives──▶ Listener ──accept──▶ connection task (hyper http1)
//!                                                  │
//!                                    resolve ◀─────┤ Route Registry
//!                                                  │
//!                       Handler::Http ◀────────────┼──────────▶ Handler::WebSocket
//!                       (one response per request) │            (session task, tracked
//!                                                  │             in the SessionRegistry)
//! ```
//!
//! # Dispatch
//!
//! - No matching route: `404 text/html` with `The resource '<target>' was not found.`
//! - [`ApplicationError`]: its status and message.
//! - Any other failure, including a panic: `500` with the failure's message.
//! - A WebSocket route without an upgrade request: `400`.
//!
//! Keep-alive follows HTTP/1.1 rules and every engine response carries a
//! `Server` header.
//!
//! # Example
//!
//! ```rust,no_run
//! use critter_server::{ApplicationError, Request, WebServer};
//! use http::Method;
//!
//! let server = WebServer::bind("127.0.0.1:8080")?;
//! server.register_http_route(Method::GET, "/admin", |_req: Request| async {
//!     Err::<&str, _>(ApplicationError::forbidden("forbidden"))
//! })?;
//! server.run()?;
//! # Ok::<(), critter_server::ServerError>(())
//! ```

pub mod config;
mod error;
pub mod handler;
mod listener;
mod pool;
mod response;
mod server;
mod session;
pub mod shutdown;
pub mod static_files;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ServerError, ServerResult};
pub use handler::{
    ApplicationError, BoxFuture, Handler, HandlerError, HttpHandler, IntoResponse, PathCaptures,
    Request, RequestExt, Response, WebSocketHandler,
};
pub use pool::{StopHandle, WORKER_THREAD_NAME};
pub use server::WebServer;
pub use shutdown::{ShutdownReceiver, ShutdownSignal};
pub use static_files::{StaticFileError, StaticFiles};

// Re-exported so hosts need only this crate for WebSocket routes.
pub use critter_ws::{CloseCode, Message, SessionId, WebSocket, WebSocketSession, WsError};

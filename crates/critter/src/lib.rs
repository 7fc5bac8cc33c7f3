//! # Critter
//!
//! **Embeddable HTTP/WebSocket request dispatcher**
//!
//! Critter lives inside a host process. The host registers handlers against
//! `(method, path regex)` pairs and starts a pool of worker threads. Each
//! connection is served with HTTP/1.1 keep-alive and may be upgraded to a
//! WebSocket session that the host can enumerate and message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use critter::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = WebServer::bind("127.0.0.1:8080")?;
//!
//!     server.register_http_route(Method::GET, "/hello/(?P<name>[a-z]+)", |req: Request| async move {
//!         let name = req.captures().and_then(|c| c.name("name")).unwrap_or("world").to_string();
//!         Ok::<_, HandlerError>(format!("hello, {name}"))
//!     })?;
//!
//!     server.register_ws_route("/chat", |mut ws| async move {
//!         while let Some(Ok(Message::Text(text))) = ws.recv().await {
//!             if ws.send_text(text).await.is_err() {
//!                 break;
//!             }
//!         }
//!     })?;
//!
//!     server.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! critter-router     Registry<H>: ordered regex routes, first match wins
//! critter-ws         WebSocket sessions and the session registry
//! critter-server     WebServer: listener, worker pool, connection loop
//! critter-config     ConfigLoader: toml/json files, env overrides
//! critter-telemetry  tracing subscriber and Prometheus metrics
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use critter_config as config;
pub use critter_router as router;
pub use critter_server as server;
pub use critter_telemetry as telemetry;
pub use critter_ws as ws;

pub use critter_server::{WebServer, ServerConfig, ServerError, ServerResult};

// Re-exported so handlers can name methods and status codes.
pub use http;

/// Prelude module for convenient imports.
///
/// ```rust
/// use critter::prelude::*;
/// ```
pub mod prelude {
    pub use critter_server::{
        ApplicationError, Handler, HandlerError, IntoResponse, Request, RequestExt, Response,
        ServerConfig, ServerError, ServerResult, StaticFiles, StopHandle, WebServer,
    };

    pub use critter_router::Captures;

    pub use critter_ws::{
        CloseCode, Message, SessionId, WebSocket, WebSocketConfig, WebSocketSession, WsError,
    };

    pub use critter_config::{ConfigLoader, CritterConfig};

    pub use critter_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};

    pub use http::{Method, StatusCode};
}

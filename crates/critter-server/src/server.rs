//! The host-facing server.
//!
//! # Example
//!
//! ```rust,no_run
//! use critter_server::{Request, ServerConfig, WebServer};
//! use http::Method;
//!
//! let server = WebServer::new(ServerConfig::builder().http_addr("127.0.0.1:8080").build())?;
//!
//! server.register_http_route(Method::GET, "/hello", |_req: Request| async {
//!     Ok::<_, std::convert::Infallible>("world")
//! })?;
//! server.register_ws_route("/echo", |mut ws| async move {
//!     while let Some(Ok(msg)) = ws.recv().await {
//!         if msg.is_text() && ws.send(msg).await.is_err() {
//!             break;
//!         }
//!     }
//! })?;
//! server.register_static_files("/assets/", "./public")?;
//!
//! server.start(4)?;
//! // ... later
//! server.stop();
//! # Ok::<(), critter_server::ServerError>(())
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use critter_ws::{SessionRegistry, WebSocket, WebSocketSession};
use http::Method;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{ApplicationError, Handler, HandlerError, IntoResponse, Request, RequestExt, Response};
use crate::listener::{self, Listener};
use crate::pool::{StopHandle, WorkerPool};
use crate::response;
use crate::session::Shared;
use crate::static_files::{StaticFileError, StaticFiles};

/// An embeddable HTTP/WebSocket server.
///
/// The socket is bound by [`new`](Self::new). Routes can be registered
/// before or after the server starts; a route registered later is visible to
/// the next request that resolves. Dropping the server stops it and joins
/// its worker threads.
pub struct WebServer {
    // Dropped first, so workers are joined before the socket closes.
    pool: WorkerPool,
    shared: Arc<Shared>,
    listener: Listener,
}

impl WebServer {
    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`](crate::ServerError::Bind) if the
    /// address is in use or not permitted, and
    /// [`ServerError::InvalidAddress`](crate::ServerError::InvalidAddress) if
    /// it does not parse.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let listener = Listener::bind(config.http_addr())?;
        info!(addr = %listener.local_addr(), "bound");
        let pool = WorkerPool::new(config.shutdown_timeout());

        Ok(Self {
            pool,
            shared: Arc::new(Shared::new(config)),
            listener,
        })
    }

    /// Binds `addr` with default configuration otherwise.
    pub fn bind(addr: impl Into<String>) -> ServerResult<Self> {
        Self::new(ServerConfig::builder().http_addr(addr).build())
    }

    /// The bound address, with the real port when `0` was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Adds a route with an already built handler.
    pub fn register(&self, method: Method, pattern: &str, handler: Handler) -> ServerResult<()> {
        debug!(%method, pattern, websocket = handler.is_websocket(), "registering route");
        self.shared.routes.write().add(method, pattern, handler)?;
        Ok(())
    }

    /// Routes `method` requests whose path fully matches `pattern` to `handler`.
    ///
    /// Capture groups of `pattern` are available through
    /// [`RequestExt::captures`].
    pub fn register_http_route<F, Fut, R, E>(&self, method: Method, pattern: &str, handler: F) -> ServerResult<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoResponse,
        E: Into<HandlerError>,
    {
        self.register(method, pattern, Handler::http(handler))
    }

    /// Routes WebSocket upgrades on paths matching `pattern` to `handler`.
    ///
    /// The route binds `GET`. The session is listed by
    /// [`web_socket_sessions`](Self::web_socket_sessions) from the upgrade
    /// until it closes.
    pub fn register_ws_route<F, Fut>(&self, pattern: &str, handler: F) -> ServerResult<()>
    where
        F: Fn(WebSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(Method::GET, pattern, Handler::websocket(handler))
    }

    /// Serves files below `dir` for paths under `prefix`.
    ///
    /// A trailing `/` on `prefix` is ignored. `GET` and `HEAD` are bound.
    pub fn register_static_files(&self, prefix: &str, dir: impl AsRef<Path>) -> ServerResult<()> {
        self.register_static(prefix, StaticFiles::new(dir))
    }

    /// Like [`register_static_files`](Self::register_static_files) with a
    /// configured [`StaticFiles`].
    pub fn register_static(&self, prefix: &str, files: StaticFiles) -> ServerResult<()> {
        let pattern = static_pattern(prefix);
        let files = Arc::new(files);

        let handler = Handler::http(move |request: Request| {
            let files = Arc::clone(&files);
            async move { serve_static(&files, &request).await }
        });

        self.register(Method::GET, &pattern, handler.clone())?;
        self.register(Method::HEAD, &pattern, handler)
    }

    /// A snapshot of the live WebSocket sessions.
    ///
    /// A session is registered once its upgrade completes on the server
    /// side, which is shortly after the client has read the `101` response.
    /// A client that just connected may therefore not be listed yet.
    pub fn web_socket_sessions(&self) -> Vec<Arc<WebSocketSession>> {
        self.shared.sessions.snapshot()
    }

    /// The live session registry.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.shared.sessions
    }

    /// Sends `text` to every live session. Returns how many sends succeeded.
    pub async fn broadcast_text(&self, text: &str) -> usize {
        let mut delivered = 0;
        for session in self.web_socket_sessions() {
            if session.send_text(text).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Starts serving on `threads` worker threads and returns immediately.
    ///
    /// `0` uses [`ServerConfig::worker_threads`].
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`](crate::ServerError::AlreadyRunning)
    /// if the server is running, or `Runtime` if the workers cannot be spawned.
    pub fn start(&self, threads: usize) -> ServerResult<()> {
        let threads = if threads == 0 {
            self.shared.config.worker_threads()
        } else {
            threads
        };
        let shared = Arc::clone(&self.shared);
        let bound = &self.listener;
        self.pool.start(threads, move |shutdown| {
            let tokio_listener = bound.to_tokio()?;
            Ok(listener::serve(tokio_listener, shared, shutdown))
        })
    }

    /// Serves on the calling thread until [`stop`](Self::stop) is called
    /// from another thread or a handler.
    pub fn run(&self) -> ServerResult<()> {
        let shared = Arc::clone(&self.shared);
        let bound = &self.listener;
        self.pool.run(move |shutdown| {
            let tokio_listener = bound.to_tokio()?;
            Ok(listener::serve(tokio_listener, shared, shutdown))
        })
    }

    /// Stops accepting and asks open connections to finish. Idempotent.
    pub fn stop(&self) {
        self.pool.stop();
    }

    /// A cloneable handle that can stop the server, e.g. from a handler.
    pub fn stop_handle(&self) -> StopHandle {
        self.pool.stop_handle()
    }

    /// Whether the server is serving and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.pool.stop_handle().is_running()
    }
}

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("local_addr", &self.local_addr())
            .field("routes", &self.shared.routes.read().len())
            .field("sessions", &self.shared.sessions.len())
            .finish_non_exhaustive()
    }
}

/// `prefix` with any trailing `/` removed, followed by a tail capture.
fn static_pattern(prefix: &str) -> String {
    format!("{}(/.*)", prefix.trim_end_matches('/'))
}

async fn serve_static(files: &StaticFiles, request: &Request) -> Result<Response, ApplicationError> {
    let tail = request.captures().and_then(|c| c.tail()).unwrap_or("/");
    files
        .handle(tail, request.headers(), request.method())
        .await
        .map_err(|e| match e {
            StaticFileError::NotFound(_) => {
                let target = request
                    .uri()
                    .path_and_query()
                    .map_or_else(|| request.uri().path(), |pq| pq.as_str());
                ApplicationError::not_found(response::not_found_message(target))
            }
            other => ApplicationError::new(other.status_code(), other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pattern() {
        assert_eq!(static_pattern("/assets/"), "/assets(/.*)");
        assert_eq!(static_pattern("/assets"), "/assets(/.*)");
        assert_eq!(static_pattern("/"), "(/.*)");
    }

    #[test]
    fn test_registration() {
        let server = WebServer::bind("127.0.0.1:0").unwrap();
        server
            .register_http_route(Method::GET, "/a", |_req: Request| async {
                Ok::<_, HandlerError>("a")
            })
            .unwrap();
        server.register_ws_route("/ws", |_ws| async {}).unwrap();
        server.register_static_files("/files/", ".").unwrap();

        let routes = server.shared.routes.read();
        let summary: Vec<_> = routes
            .routes()
            .map(|r| (r.method().clone(), r.pattern().to_string(), r.handler().is_websocket()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Method::GET, "/a".to_string(), false),
                (Method::GET, "/ws".to_string(), true),
                (Method::GET, "/files(/.*)".to_string(), false),
                (Method::HEAD, "/files(/.*)".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let server = WebServer::bind("127.0.0.1:0").unwrap();
        let result = server.register_ws_route("/ws/(", |_ws| async {});
        assert!(matches!(result, Err(crate::ServerError::Route(_))));
    }

    #[test]
    fn test_drop_unstarted() {
        let server = WebServer::bind("127.0.0.1:0").unwrap();
        server.stop();
        assert!(!server.is_running());
        assert!(server.web_socket_sessions().is_empty());
        drop(server);
    }
}

//! The per-connection session loop.
//!
//! Each accepted socket is served by one hyper HTTP/1 connection with
//! keep-alive and upgrades enabled. For every request hyper reads, the
//! dispatcher buffers the body, resolves the route and answers with exactly
//! one response. A WebSocket route hands the socket to a spawned session
//! task once the `101` has been written, and HTTP never resumes on it.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use critter_router::Registry;
use critter_telemetry::metrics::{record_request, record_ws_closed, record_ws_opened};
use critter_ws::{
    complete_upgrade, switching_protocols, validate_upgrade_request, wants_upgrade, CloseCode,
    SessionInfo, SessionRegistry, WsError,
};
use futures_util::FutureExt;
use http::HeaderValue;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::{TokioIo, TokioTimer};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::handler::{Handler, HandlerError, HttpHandler, PathCaptures, Request, Response, WebSocketHandler};
use crate::response;
use crate::shutdown::ShutdownSignal;

/// State shared by the listener and every connection.
/// How long a stopping server waits to write a session's close frame.
const SHUTDOWN_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) struct Shared {
    pub(crate) routes: RwLock<Registry<Handler>>,
    pub(crate) sessions: Arc<SessionRegistry>,
    pub(crate) config: ServerConfig,
    pub(crate) server_name: HeaderValue,
}

impl Shared {
    pub(crate) fn new(config: ServerConfig) -> Self {
        let server_name = HeaderValue::from_str(config.server_name()).unwrap_or_else(|_| {
            warn!(server_name = config.server_name(), "invalid Server header value, using default");
            HeaderValue::from_static(crate::config::DEFAULT_SERVER_NAME)
        });
        Self {
            routes: RwLock::new(Registry::new()),
            sessions: Arc::new(SessionRegistry::new()),
            config,
            server_name,
        }
    }
}

/// Failures that end the connection without a response.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("failed to read request body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] WsError),
}

/// Serves one accepted socket until the peer leaves, a response closes the
/// connection, or `shutdown` fires.
pub(crate) async fn serve_connection(
    shared: Arc<Shared>,
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: ShutdownSignal,
) {
    let mut builder = http1::Builder::new();
    builder.keep_alive(true);
    if let Some(timeout) = shared.config.header_read_timeout() {
        builder.timer(TokioTimer::new()).header_read_timeout(timeout);
    }

    let service_state = Arc::clone(&shared);
    let service_shutdown = shutdown.clone();
    let service = service_fn(move |request: hyper::Request<Incoming>| {
        let shared = Arc::clone(&service_state);
        let shutdown = service_shutdown.clone();
        async move { dispatch(shared, request, peer, shutdown).await }
    });

    let conn = builder
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades();
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            debug!(%peer, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        if e.is_user() {
            warn!(%peer, error = %e, "connection closed");
        } else {
            debug!(%peer, error = %e, "connection closed");
        }
    }
}

/// Answers one request.
async fn dispatch(
    shared: Arc<Shared>,
    request: hyper::Request<Incoming>,
    peer: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<http::Response<Full<Bytes>>, ConnectionError> {
    let started = Instant::now();
    let method = request.method().clone();
    let keep_alive = response::wants_keep_alive(&request);
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

    let (parts, body) = request.into_parts();
    let limit = shared.config.max_body_size();
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            debug!(%peer, %method, path = %target, limit, "request body too large");
            let response = response::finalize(response::payload_too_large(limit), false, &shared.server_name);
            return Ok(complete(&method, response, started));
        }
        Err(e) => return Err(ConnectionError::Body(e)),
    };
    let mut request = Request::from_parts(parts, body);

    let resolved = {
        let routes = shared.routes.read();
        routes
            .resolve(&method, request.uri().path())
            .map(|found| (found.handler.clone(), found.captures))
    };

    let response = match resolved {
        Err(miss) => {
            debug!(%peer, method = %miss.method(), path = miss.path(), "no route");
            response::not_found(&target)
        }
        Ok((Handler::WebSocket(handler), _)) if wants_upgrade(&request) => {
            let accept = validate_upgrade_request(&request).map_err(|e| {
                warn!(%peer, path = %target, error = %e, "rejecting websocket handshake");
                e
            })?;
            let switching = switching_protocols(&accept)?;
            let on_upgrade = hyper::upgrade::on(&mut request);
            let info = SessionInfo::new(request.uri().path()).peer_addr(peer);
            spawn_session(Arc::clone(&shared), on_upgrade, handler, info, shutdown);
            let response = response::finalize(switching, true, &shared.server_name);
            return Ok(complete(&method, response, started));
        }
        Ok((Handler::WebSocket(_), _)) => {
            debug!(%peer, path = %target, "websocket route without upgrade");
            response::upgrade_required(&target)
        }
        Ok((Handler::Http(handler), captures)) => {
            request.extensions_mut().insert(PathCaptures(captures));
            invoke(handler, request, peer).await
        }
    };

    let response = response::finalize(response, keep_alive, &shared.server_name);
    debug!(%peer, %method, path = %target, status = response.status().as_u16(), "request complete");
    Ok(complete(&method, response, started))
}

fn complete(method: &http::Method, response: Response, started: Instant) -> http::Response<Full<Bytes>> {
    record_request(method.as_str(), response.status().as_u16(), started.elapsed());
    response.map(Full::new)
}

/// Runs an HTTP handler and classifies its outcome.
async fn invoke(handler: HttpHandler, request: Request, peer: SocketAddr) -> Response {
    let path = request.uri().path().to_string();
    let outcome = AssertUnwindSafe(async move { handler(request).await })
        .catch_unwind()
        .await;

    let err = match outcome {
        Ok(Ok(response)) => return response,
        Ok(Err(err)) => err,
        Err(_) => {
            error!(%peer, %path, "handler panicked");
            HandlerError::unhandled()
        }
    };

    match &err {
        HandlerError::Application(app) => {
            warn!(%peer, %path, status = app.status().as_u16(), error = %app, "handler failed");
        }
        HandlerError::Unclassified(message) => {
            error!(%peer, %path, error = %message, "unhandled handler failure");
        }
    }
    response::from_error(&err)
}

/// Runs a WebSocket handler once the upgrade completes.
///
/// The session is closed with `1001 Going Away` when the server stops.
fn spawn_session(
    shared: Arc<Shared>,
    on_upgrade: OnUpgrade,
    handler: WebSocketHandler,
    info: SessionInfo,
    shutdown: ShutdownSignal,
) {
    tokio::spawn(async move {
        let upgraded = tokio::select! {
            upgraded = on_upgrade => match upgraded {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    debug!(error = %e, path = %info.path, "upgrade did not complete");
                    return;
                }
            },
            () = shutdown.recv() => return,
        };

        let ws = complete_upgrade(TokioIo::new(upgraded), shared.config.websocket(), info).await;
        let session = Arc::clone(ws.session());
        shared.sessions.track(&session);
        record_ws_opened();
        session.on_close(|closed| {
            record_ws_closed();
            debug!(session_id = %closed.id(), "websocket session closed");
        });
        debug!(session_id = %session.id(), path = session.path(), "websocket session opened");

        let run = AssertUnwindSafe(handler(ws)).catch_unwind();
        tokio::pin!(run);
        let stopped = tokio::select! {
            outcome = &mut run => {
                if outcome.is_err() {
                    error!(session_id = %session.id(), "websocket handler panicked");
                }
                false
            }
            () = shutdown.recv() => true,
        };

        if stopped {
            debug!(session_id = %session.id(), "closing websocket session for shutdown");
            let close = session.close(CloseCode::GoingAway, "server shutting down");
            match tokio::time::timeout(SHUTDOWN_CLOSE_TIMEOUT, close).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(session_id = %session.id(), error = %e, "close frame not sent"),
                Err(_) => warn!(session_id = %session.id(), "timed out sending close frame"),
            }
            // Dropping the handler drops its socket and marks the session closed.
        }
    });
}

//! The accepting socket.
//!
//! Binding happens synchronously when the server is created, so a port
//! conflict is reported to the caller of [`WebServer::new`](crate::WebServer::new)
//! rather than from inside a worker. Accepting happens on the worker pool.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use critter_telemetry::metrics::record_accept_error;
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::session::{serve_connection, Shared};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Pause after a failed accept, so a persistent failure such as descriptor
/// exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// A bound, not yet accepting, TCP listener.
#[derive(Debug)]
pub(crate) struct Listener {
    inner: std::net::TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds `addr`. On Unix the standard library enables `SO_REUSEADDR`.
    pub(crate) fn bind(addr: &str) -> ServerResult<Self> {
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(addr.to_string()))?;

        let bind_err = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let inner = std::net::TcpListener::bind(socket_addr).map_err(bind_err)?;
        inner.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        Ok(Self { inner, local_addr })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Attaches a handle to the listening socket to the current runtime.
    ///
    /// Must be called with a runtime entered.
    pub(crate) fn to_tokio(&self) -> ServerResult<tokio::net::TcpListener> {
        let std_listener = self.inner.try_clone().map_err(ServerError::Runtime)?;
        tokio::net::TcpListener::from_std(std_listener).map_err(ServerError::Runtime)
    }
}

/// Accepts connections until `shutdown` fires, then waits up to the
/// configured shutdown timeout for open connections to finish.
pub(crate) async fn serve(listener: tokio::net::TcpListener, shared: Arc<Shared>, shutdown: ShutdownSignal) {
    let tracker = ConnectionTracker::new();
    let local_addr = listener.local_addr().ok();
    info!(addr = ?local_addr, "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(%peer, error = %e, "failed to set TCP_NODELAY");
                    }
                    let token = tracker.acquire();
                    let shared = Arc::clone(&shared);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        serve_connection(shared, stream, peer, shutdown).await;
                        drop(token);
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    record_accept_error();
                    tokio::select! {
                        () = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                        () = shutdown.recv() => break,
                    }
                }
            },
            () = shutdown.recv() => break,
        }
    }

    drop(listener);
    let timeout = shared.config.shutdown_timeout();
    debug!(active = tracker.active_connections(), ?timeout, "draining connections");

    if tokio::time::timeout(timeout, tracker.wait_for_idle()).await.is_err() {
        warn!(
            active = tracker.active_connections(),
            "shutdown timeout reached with connections still open"
        );
    }
    info!(addr = ?local_addr, "listener stopped");
}

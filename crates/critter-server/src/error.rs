//! Server error types.

use std::io;

use critter_router::RouteError;
use thiserror::Error;

/// Errors surfaced to the host by [`WebServer`](crate::WebServer).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configured address could not be parsed.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// A route pattern failed to compile.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The runtime could not be built or the listener could not be attached.
    #[error("runtime error: {0}")]
    Runtime(#[source] io::Error),

    /// `start` or `run` was called while the pool was already running.
    #[error("server is already running")]
    AlreadyRunning,
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use critter_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .worker_threads(4)
//!     .shutdown_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:8080");
//! assert_eq!(config.worker_threads(), 4);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use critter_ws::WebSocketConfig;

/// Default HTTP bind address (IPv6 any-address, dual stack where supported).
pub const DEFAULT_HTTP_ADDR: &str = "[::]:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default limit on a buffered request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Default `Server` header value.
pub const DEFAULT_SERVER_NAME: &str = concat!("critter/", env!("CARGO_PKG_VERSION"));

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    worker_threads: usize,
    shutdown_timeout: Duration,
    header_read_timeout: Option<Duration>,
    server_name: String,
    max_body_size: usize,
    websocket: WebSocketConfig,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses and returns the HTTP address as a `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Worker threads used by [`WebServer::start`](crate::WebServer::start)
    /// when the caller passes `0`.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Deadline for reading a request head, if any.
    #[must_use]
    pub fn header_read_timeout(&self) -> Option<Duration> {
        self.header_read_timeout
    }

    /// Value of the `Server` header on every response.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Largest request body that will be buffered.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Protocol limits for upgraded connections.
    #[must_use]
    pub fn websocket(&self) -> &WebSocketConfig {
        &self.websocket
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    worker_threads: usize,
    shutdown_timeout: Duration,
    header_read_timeout: Option<Duration>,
    server_name: String,
    max_body_size: usize,
    websocket: WebSocketConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            worker_threads: std::thread::available_parallelism().map_or(1, usize::from),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            header_read_timeout: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            websocket: WebSocketConfig::default(),
        }
    }

    /// Sets the HTTP bind address (e.g., "0.0.0.0:8080", "127.0.0.1:0").
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the default worker thread count. Values below one become one.
    #[must_use]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Sets how long dropping a started server waits for connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Closes connections whose request head takes longer than `timeout`.
    ///
    /// Disabled by default, which lets idle keep-alive connections stay open
    /// until the peer or [`WebServer::stop`](crate::WebServer::stop) ends them.
    #[must_use]
    pub fn header_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    /// Sets the `Server` header value.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Sets the request body limit in bytes.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Sets the WebSocket protocol configuration.
    #[must_use]
    pub fn websocket(mut self, config: WebSocketConfig) -> Self {
        self.websocket = config;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            worker_threads: self.worker_threads,
            shutdown_timeout: self.shutdown_timeout,
            header_read_timeout: self.header_read_timeout,
            server_name: self.server_name,
            max_body_size: self.max_body_size,
            websocket: self.websocket,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)
        );
        assert!(config.header_read_timeout().is_none());
        assert!(config.worker_threads() >= 1);
        assert!(config.server_name().starts_with("critter/"));
        assert_eq!(config.max_body_size(), DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_default_addr_is_ipv6_any() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:9090")
            .worker_threads(0)
            .shutdown_timeout(Duration::from_secs(5))
            .header_read_timeout(Some(Duration::from_secs(2)))
            .server_name("test/1.0")
            .max_body_size(1024)
            .websocket(WebSocketConfig::new().max_message_size(Some(4096)))
            .build();

        assert_eq!(config.http_addr(), "127.0.0.1:9090");
        assert_eq!(config.worker_threads(), 1);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.header_read_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.server_name(), "test/1.0");
        assert_eq!(config.max_body_size(), 1024);
        assert_eq!(config.websocket().max_message_size, Some(4096));
    }

    #[test]
    fn test_socket_addr_invalid() {
        let config = ServerConfig::builder().http_addr("not-a-valid-address").build();
        assert!(config.socket_addr().is_err());
    }
}

//! Configuration schema types.
//!
//! Every section rejects unknown keys and falls back to its defaults for
//! keys that are absent.

use critter_server::config::{
    DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_SIZE, DEFAULT_SERVER_NAME, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use critter_telemetry::LogFormat;
use critter_ws::WebSocketConfig;
use serde::{Deserialize, Serialize};

/// `[server]` section.
///
/// # Example
///
/// ```
/// use critter_config::ServerSection;
///
/// let section = ServerSection {
///     http_addr: "127.0.0.1:3000".to_string(),
///     worker_threads: Some(4),
///     ..Default::default()
/// };
/// assert_eq!(section.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Worker threads used by `start(0)`. Unset means one per core.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request head read timeout in milliseconds. Unset disables it.
    #[serde(default)]
    pub header_read_timeout_ms: Option<u64>,

    /// `Server` header value.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Request body limit in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            worker_threads: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
            header_read_timeout_ms: None,
            server_name: default_server_name(),
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

/// `[websocket]` section. A `0` limit disables that limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebSocketSection {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Maximum frame size in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for WebSocketSection {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl WebSocketSection {
    /// Converts to the session protocol configuration.
    #[must_use]
    pub fn to_websocket_config(&self) -> WebSocketConfig {
        let limit = |size: usize| (size > 0).then_some(size);
        WebSocketConfig::new()
            .max_message_size(limit(self.max_message_size))
            .max_frame_size(limit(self.max_frame_size))
    }
}

fn default_max_message_size() -> usize {
    WebSocketConfig::default().max_message_size.unwrap_or(0)
}

fn default_max_frame_size() -> usize {
    WebSocketConfig::default().max_frame_size.unwrap_or(0)
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable log output.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info" or "critter_server=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json", "pretty" or "compact".
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the event target.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[metrics]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Address for the Prometheus scrape endpoint. Unset means the host
    /// renders metrics itself.
    #[serde(default)]
    pub listen_addr: Option<String>,
}

fn default_true() -> bool {
    true
}

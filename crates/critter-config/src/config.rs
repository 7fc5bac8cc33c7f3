//! The root configuration type.

use std::net::SocketAddr;
use std::time::Duration;

use critter_server::ServerConfig;
use critter_telemetry::{LogConfig, LogFormat, MetricsConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingSection, MetricsSection, ServerSection, WebSocketSection};

/// Complete critter configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use critter_config::CritterConfig;
///
/// let config = CritterConfig::default();
/// assert_eq!(config.server.http_addr, "[::]:8080");
/// let server = config.server_config();
/// assert_eq!(server.http_addr(), "[::]:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CritterConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerSection,

    /// WebSocket protocol limits.
    #[serde(default)]
    pub websocket: WebSocketSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl CritterConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `server.http_addr` is not a socket address
    /// - `server.worker_threads` is zero
    /// - `server.server_name` is empty or not a valid header value
    /// - `metrics.listen_addr` is set and not a socket address
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.worker_threads == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.worker_threads",
                "must be at least 1",
            ));
        }

        let name = &self.server.server_name;
        if name.is_empty() || !name.bytes().all(|b| b == b'\t' || (0x20..0x7f).contains(&b)) {
            return Err(ConfigError::invalid_value(
                "server.server_name",
                "must be non-empty visible ASCII",
            ));
        }

        if let Some(addr) = &self.metrics.listen_addr {
            if addr.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::invalid_value(
                    "metrics.listen_addr",
                    format!("invalid socket address: {addr}"),
                ));
            }
        }

        Ok(())
    }

    /// Debug-level pretty logging with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.file_line_info = true;
        config.logging.thread_ids = true;
        config
    }

    /// Info-level JSON logging.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }

    /// Builds the server configuration from the `[server]` and
    /// `[websocket]` sections.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        let server = &self.server;
        let mut builder = ServerConfig::builder()
            .http_addr(server.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
            .header_read_timeout(server.header_read_timeout_ms.map(Duration::from_millis))
            .server_name(server.server_name.clone())
            .max_body_size(server.max_body_size)
            .websocket(self.websocket.to_websocket_config());
        if let Some(threads) = server.worker_threads {
            builder = builder.worker_threads(threads);
        }
        builder.build()
    }

    /// Builds the logging configuration from the `[logging]` section.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let logging = &self.logging;
        LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            format: logging.format,
            file_line_info: logging.file_line_info,
            thread_ids: logging.thread_ids,
            include_target: logging.include_target,
        }
    }

    /// Builds the metrics configuration from the `[metrics]` section.
    #[must_use]
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.metrics.enabled,
            listen_addr: self.metrics.listen_addr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        CritterConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_http_addr() {
        let mut config = CritterConfig::default();
        config.server.http_addr = "localhost".to_string();
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "server.http_addr"),
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = CritterConfig::default();
        config.server.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_name_must_be_header_safe() {
        let mut config = CritterConfig::default();
        config.server.server_name = "bad\nname".to_string();
        assert!(config.validate().is_err());
        config.server.server_name = String::new();
        assert!(config.validate().is_err());
        config.server.server_name = "my-host/2.1".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_metrics_addr() {
        let mut config = CritterConfig::default();
        config.metrics.listen_addr = Some("nowhere".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_conversion() {
        let mut config = CritterConfig::default();
        config.server.http_addr = "127.0.0.1:0".to_string();
        config.server.worker_threads = Some(3);
        config.server.shutdown_timeout_secs = 5;
        config.server.header_read_timeout_ms = Some(250);
        config.server.server_name = "embedded".to_string();
        config.server.max_body_size = 1024;
        config.websocket.max_frame_size = 0;

        let server = config.server_config();
        assert_eq!(server.http_addr(), "127.0.0.1:0");
        assert_eq!(server.worker_threads(), 3);
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.header_read_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(server.server_name(), "embedded");
        assert_eq!(server.max_body_size(), 1024);
        assert_eq!(server.websocket().max_frame_size, None);
    }

    #[test]
    fn test_log_config_conversion() {
        let log = CritterConfig::development().log_config();
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Pretty);
        assert!(log.file_line_info);

        let log = CritterConfig::production().log_config();
        assert_eq!(log.format, LogFormat::Json);
        assert!(!log.file_line_info);
    }

    #[test]
    fn test_metrics_config_conversion() {
        let mut config = CritterConfig::default();
        config.metrics.enabled = true;
        config.metrics.listen_addr = Some("127.0.0.1:9090".to_string());
        let metrics = config.metrics_config();
        assert!(metrics.enabled);
        assert_eq!(metrics.listen_addr.as_deref(), Some("127.0.0.1:9090"));
    }
}

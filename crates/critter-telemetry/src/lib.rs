//! Logging and metrics for critter.
//!
//! - **Logging**: structured `tracing` output as JSON, pretty or compact text
//! - **Metrics**: Prometheus-format counters and gauges via the `metrics` crate
//!
//! Both are optional. The server crates record through the `tracing` and
//! `metrics` facades whether or not anything here was initialized.
//!
//! # Example
//!
//! ```rust,ignore
//! use critter_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
//!
//! init_logging(&LogConfig::production())?;
//! init_metrics(&MetricsConfig { enabled: true, listen_addr: Some("0.0.0.0:9090".into()) })?;
//! ```

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

//! Prometheus metrics for critter.
//!
//! The server records through the `metrics` facade unconditionally. Until a
//! recorder is installed (by [`init_metrics`] or by the host) every call is a
//! no-op.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `critter_http_requests_total` | Counter | `method`, `status` | Completed HTTP requests |
//! | `critter_http_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `critter_ws_sessions` | Gauge | - | Live WebSocket sessions |
//! | `critter_ws_sessions_total` | Counter | - | WebSocket sessions opened |
//! | `critter_accept_errors_total` | Counter | - | Failed `accept` calls |

use std::net::SocketAddr;
use std::sync::{mpsc, OnceLock};
use std::thread;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Completed HTTP requests.
pub const HTTP_REQUESTS_TOTAL: &str = "critter_http_requests_total";
/// HTTP request latency.
pub const HTTP_REQUEST_DURATION: &str = "critter_http_request_duration_seconds";
/// Live WebSocket sessions.
pub const WS_SESSIONS: &str = "critter_ws_sessions";
/// WebSocket sessions opened.
pub const WS_SESSIONS_TOTAL: &str = "critter_ws_sessions_total";
/// Failed accepts.
pub const ACCEPT_ERRORS_TOTAL: &str = "critter_accept_errors_total";

/// Metrics configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Address for a scrape endpoint (e.g., "0.0.0.0:9090").
    ///
    /// Without it the recorder is installed and read via [`render_metrics`].
    pub listen_addr: Option<String>,
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidAddress`] for an unparsable
/// `listen_addr` and [`TelemetryError::MetricsInit`] if the recorder or
/// exporter cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }
    if METRICS_HANDLE.get().is_some() {
        return Err(TelemetryError::AlreadyInitialized("metrics"));
    }

    let handle = match &config.listen_addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            spawn_exporter(addr)?
        }
        None => PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?,
    };
    let _ = METRICS_HANDLE.set(handle);

    describe_metrics();
    Ok(())
}

/// Installs the recorder and serves the scrape endpoint on a dedicated
/// `critter-metrics` thread.
fn spawn_exporter(addr: SocketAddr) -> TelemetryResult<PrometheusHandle> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("critter-metrics".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(Err(TelemetryError::MetricsInit(e.to_string())));
                    return;
                }
            };

            // Binding the listener needs a runtime context.
            let built = {
                let _guard = runtime.enter();
                PrometheusBuilder::new().with_http_listener(addr).build()
            };
            let (recorder, exporter) = match built {
                Ok(built) => built,
                Err(e) => {
                    let _ = tx.send(Err(TelemetryError::MetricsInit(e.to_string())));
                    return;
                }
            };

            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                let _ = tx.send(Err(TelemetryError::MetricsInit(e.to_string())));
                return;
            }
            let _ = tx.send(Ok(handle));

            tracing::info!(%addr, "metrics endpoint listening");
            if let Err(e) = runtime.block_on(exporter) {
                tracing::error!(error = ?e, "metrics exporter stopped");
            }
        })
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    rx.recv()
        .map_err(|_| TelemetryError::MetricsInit("metrics thread exited".to_string()))?
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not installed a recorder.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the standard metrics.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests processed");
    describe_histogram!(HTTP_REQUEST_DURATION, "HTTP request duration in seconds");
    describe_gauge!(WS_SESSIONS, "Number of live WebSocket sessions");
    describe_counter!(WS_SESSIONS_TOTAL, "Total number of WebSocket sessions opened");
    describe_counter!(ACCEPT_ERRORS_TOTAL, "Total number of failed accepts");
}

/// Records a completed HTTP request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(HTTP_REQUEST_DURATION, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records a WebSocket session opening.
pub fn record_ws_opened() {
    gauge!(WS_SESSIONS).increment(1.0);
    counter!(WS_SESSIONS_TOTAL).increment(1);
}

/// Records a WebSocket session closing.
pub fn record_ws_closed() {
    gauge!(WS_SESSIONS).decrement(1.0);
}

/// Records a failed `accept`.
pub fn record_accept_error() {
    counter!(ACCEPT_ERRORS_TOTAL).increment(1);
}

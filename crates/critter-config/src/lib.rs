//! Typed configuration for critter hosts.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - `.env` files via `dotenvy`
//! - Strict parsing: unknown sections and keys are errors
//!
//! # Example
//!
//! ```no_run
//! use critter_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("critter.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("CRITTER")
//!     .load()?;
//!
//! critter_telemetry::init_logging(&config.log_config())?;
//! let server = critter_server::WebServer::new(config.server_config())?;
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! worker_threads = 4
//! shutdown_timeout_secs = 30
//! header_read_timeout_ms = 10000
//! server_name = "my-host/1.0"
//! max_body_size = 8388608
//!
//! [websocket]
//! max_message_size = 67108864
//! max_frame_size = 16777216
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! listen_addr = "0.0.0.0:9090"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::CritterConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingSection, MetricsSection, ServerSection, WebSocketSection};

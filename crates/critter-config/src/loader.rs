//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use critter_telemetry::LogFormat;

use crate::{ConfigError, CritterConfig};

/// Configuration loader.
///
/// Layers apply in order, later layers overriding earlier ones:
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use critter_config::ConfigLoader;
///
/// # fn main() -> Result<(), critter_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_file("critter.toml")?
///     .with_dotenv()?
///     .with_env_prefix("CRITTER")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: CritterConfig,
    env_prefix: Option<String>,
    dotenv: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader seeded with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CritterConfig::default(),
            env_prefix: None,
            dotenv: None,
        }
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = CritterConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = CritterConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// The file replaces the configuration built so far. Sections and keys
    /// the file omits take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, or does not parse (unknown keys included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format)?;

        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` ("toml" or "json").
    ///
    /// # Example
    ///
    /// ```
    /// use critter_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Apply `PREFIX__SECTION__KEY` environment variables during
    /// [`load`](Self::load). The prefix is upper-cased.
    ///
    /// - `CRITTER__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `CRITTER__LOGGING__FORMAT=compact`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load `.env` from the current directory (or a parent) before the
    /// environment layer. A missing file is not an error.
    ///
    /// Variables already set in the process environment win.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the given dotenv file when [`load`](Self::load) runs.
    ///
    /// Unlike [`with_dotenv`](Self::with_dotenv) the process environment is
    /// left untouched. Its values sit below real environment variables.
    #[must_use]
    pub fn with_dotenv_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Apply environment overrides, validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse or
    /// the final configuration fails [`CritterConfig::validate`].
    pub fn load(mut self) -> Result<CritterConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            if let Some(path) = self.dotenv.take() {
                for item in dotenvy::from_path_iter(&path)? {
                    let (key, value) = item?;
                    if env::var_os(&key).is_none() {
                        self.apply_env_var(&key, &value, &prefix)?;
                    }
                }
            }
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> CritterConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };

        let config = &mut self.config;
        match rest.split("__").collect::<Vec<_>>().as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "WORKER_THREADS"] => {
                config.server.worker_threads = parse_optional(key, value)?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "HEADER_READ_TIMEOUT_MS"] => {
                config.server.header_read_timeout_ms = parse_optional(key, value)?;
            }
            ["SERVER", "SERVER_NAME"] => config.server.server_name = value.to_string(),
            ["SERVER", "MAX_BODY_SIZE"] => {
                config.server.max_body_size = parse_number(key, value)?;
            }

            ["WEBSOCKET", "MAX_MESSAGE_SIZE"] => {
                config.websocket.max_message_size = parse_number(key, value)?;
            }
            ["WEBSOCKET", "MAX_FRAME_SIZE"] => {
                config.websocket.max_frame_size = parse_number(key, value)?;
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "FILE_LINE_INFO"] => {
                config.logging.file_line_info = parse_flag(key, value)?;
            }
            ["LOGGING", "THREAD_IDS"] => config.logging.thread_ids = parse_flag(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => {
                config.logging.include_target = parse_flag(key, value)?;
            }

            ["METRICS", "ENABLED"] => config.metrics.enabled = parse_flag(key, value)?,
            ["METRICS", "LISTEN_ADDR"] => {
                config.metrics.listen_addr = (!value.is_empty()).then(|| value.to_string());
            }

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<CritterConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// An empty value or `none` clears the setting.
fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>, ConfigError> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_number(key, value).map(Some)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, CritterConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "critter.toml",
            r#"
                [server]
                http_addr = "127.0.0.1:3000"
                worker_threads = 2
                header_read_timeout_ms = 5000

                [websocket]
                max_message_size = 1048576

                [logging]
                level = "critter_server=debug"
                format = "compact"

                [metrics]
                enabled = true
                listen_addr = "127.0.0.1:9090"
            "#,
        );

        let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.server.worker_threads, Some(2));
        assert_eq!(config.server.header_read_timeout_ms, Some(5000));
        assert_eq!(config.server.shutdown_timeout_secs, 30);
        assert_eq!(config.websocket.max_message_size, 1_048_576);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_loader_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "critter.json",
            r#"{"server": {"http_addr": "127.0.0.1:4000", "max_body_size": 1024}}"#,
        );
        let config = ConfigLoader::new().with_file(path).unwrap().load().unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:4000");
        assert_eq!(config.server.max_body_size, 1024);
    }

    #[test]
    fn test_loader_unknown_section_rejected() {
        let result = ConfigLoader::new().with_string("[tls]\nenabled = true", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "critter.yaml", "server: {}");
        let result = ConfigLoader::new().with_file(path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_loader_missing_file() {
        let result = ConfigLoader::new().with_file("/nonexistent/critter.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));

        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/critter.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "[::]:8080");
    }

    #[test]
    fn test_loader_validates() {
        let result = ConfigLoader::new()
            .with_string(r#"{"server": {"http_addr": "not an address"}}"#, "json")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_apply_env_var_server() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__SERVER__HTTP_ADDR", "10.0.0.1:9000", "T").unwrap();
        loader.apply_env_var("T__SERVER__WORKER_THREADS", "8", "T").unwrap();
        loader.apply_env_var("T__SERVER__HEADER_READ_TIMEOUT_MS", "none", "T").unwrap();
        assert_eq!(loader.config.server.http_addr, "10.0.0.1:9000");
        assert_eq!(loader.config.server.worker_threads, Some(8));
        assert_eq!(loader.config.server.header_read_timeout_ms, None);
    }

    #[test]
    fn test_apply_env_var_logging_and_metrics() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__LOGGING__FORMAT", "Pretty", "T").unwrap();
        loader.apply_env_var("T__LOGGING__THREAD_IDS", "yes", "T").unwrap();
        loader.apply_env_var("T__METRICS__ENABLED", "on", "T").unwrap();
        loader.apply_env_var("T__METRICS__LISTEN_ADDR", "", "T").unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(loader.config.logging.thread_ids);
        assert!(loader.config.metrics.enabled);
        assert_eq!(loader.config.metrics.listen_addr, None);
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_var("T__SERVER__MAX_BODY_SIZE", "lots", "T")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "T__SERVER__MAX_BODY_SIZE"));

        assert!(loader.apply_env_var("T__LOGGING__FORMAT", "xml", "T").is_err());
        assert!(loader.apply_env_var("T__SERVER__PORT", "80", "T").is_err());
    }

    #[test]
    fn test_apply_env_var_other_prefix_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEXT_EDITOR", "vim", "T").unwrap();
        assert_eq!(loader.config, CritterConfig::default());
    }

    #[test]
    fn test_dotenv_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            ".env",
            "CRITTER_DOTENV_TEST__SERVER__SHUTDOWN_TIMEOUT_SECS=7\n\
             CRITTER_DOTENV_TEST__LOGGING__LEVEL=warn\n",
        );

        let config = ConfigLoader::new()
            .with_dotenv_file(path)
            .with_env_prefix("critter_dotenv_test")
            .load()
            .unwrap();
        assert_eq!(config.server.shutdown_timeout_secs, 7);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}

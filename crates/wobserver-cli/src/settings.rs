//! Layered CLI settings
//!
//! Sources, lowest precedence first: built-in defaults, the TOML config
//! file, `WOBSERVER_*` environment variables, command-line flags.
//! Nested keys use `__` in environment variables, e.g.
//! `WOBSERVER_LOGGING__LEVEL=debug`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wobserver_client::SessionBuilder;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WOBSERVER";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "wobserver.toml";

/// Resolved CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Service host, optionally with a path prefix
    pub host: String,
    /// Use TLS
    pub secure: bool,
    /// Initial node
    pub node: String,
    /// Seconds between stream keepalive pings
    pub keepalive_interval_secs: u64,
    /// Seconds between stream reconnection attempts
    pub reconnect_delay_secs: u64,
    /// Seconds allowed for opening the stream channel
    pub connect_timeout_secs: u64,
    /// Seconds allowed for one polling request
    pub request_timeout_secs: u64,
    /// Largest accepted frame or response body, in bytes
    pub max_message_size: Option<usize>,
    /// Logging
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost:4001".to_string(),
            secure: false,
            node: "local".to_string(),
            keepalive_interval_secs: 15,
            reconnect_delay_secs: 5,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            max_message_size: None,
            logging: LoggingSettings::default(),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard error only
    #[default]
    Stderr,
    /// Rolling file only
    File,
    /// Standard error and rolling file
    Both,
    /// Logging disabled
    None,
}

/// Log file rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate every minute
    Minute,
    /// Rotate every hour
    Hourly,
    /// Rotate every day
    Daily,
    /// Never rotate
    #[default]
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub structured: bool,
    /// Log destination
    pub output: LogOutput,
    /// Directory for log files
    pub directory: Option<PathBuf>,
    /// Log file name prefix
    pub file_prefix: String,
    /// Log file rotation
    pub rotation: LogRotation,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            structured: false,
            output: LogOutput::Stderr,
            directory: None,
            file_prefix: "wobserver".to_string(),
            rotation: LogRotation::Never,
        }
    }
}

impl Settings {
    /// Load defaults, the config file and `WOBSERVER_*` variables.
    ///
    /// An explicit `path` must exist; without one, [`Settings::discover`]
    /// decides whether a file is read at all.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// [`Settings::load`] with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> CliResult<Self> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(CliError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let mut builder = Config::builder();
        if let Some(file) = &file {
            debug!("Loading settings from {}", file.display());
            builder = builder.add_source(File::from(file.as_path()).format(FileFormat::Toml));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Default config file: `./wobserver.toml`, then
    /// `<config dir>/wobserver/config.toml`.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("wobserver").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// Apply command-line flags on top
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if cli.secure {
            self.secure = true;
        }
        if let Some(node) = &cli.node {
            self.node = node.clone();
        }
    }

    /// Session builder reflecting these settings
    pub fn session_builder(&self) -> SessionBuilder {
        let builder = SessionBuilder::new(self.host.clone())
            .secure(self.secure)
            .node(self.node.as_str())
            .keepalive_interval(Duration::from_secs(self.keepalive_interval_secs))
            .reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs));

        match self.max_message_size {
            Some(max) => builder.max_message_size(max),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_flags_override() {
        let cli = Cli::try_parse_from([
            "wobserver",
            "--host",
            "10.0.0.1:4001",
            "--secure",
            "--node",
            "worker@10.0.0.2",
            "nodes",
        ])
        .unwrap();

        let mut settings = Settings::default();
        settings.apply_cli(&cli);

        assert_eq!(settings.host, "10.0.0.1:4001");
        assert!(settings.secure);
        assert_eq!(settings.node, "worker@10.0.0.2");
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/wobserver.toml")));
        assert!(matches!(result, Err(CliError::ConfigNotFound(_))));
    }

    #[test]
    fn test_session_builder_reflects_settings() {
        let settings = Settings {
            host: "example.com/wobserver".to_string(),
            node: "worker@host".to_string(),
            keepalive_interval_secs: 3,
            max_message_size: Some(1024),
            ..Settings::default()
        };

        let session = settings.session_builder().build();
        let config = session.config();
        assert_eq!(config.host, "example.com/wobserver");
        assert_eq!(session.node(), "worker@host");
        assert_eq!(config.stream.keepalive_interval, Duration::from_secs(3));
        assert_eq!(config.polling.limits.max_response_size, Some(1024));
    }
}

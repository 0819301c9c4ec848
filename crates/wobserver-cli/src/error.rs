//! Error types for CLI operations

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use wobserver_client::{SessionError, TransportError};

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// The session or its transport failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// An explicitly named config file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Session(e) if e.is_connectivity() => vec![
                "Check that the wobserver service is running",
                "Verify --host (include the path prefix if wobserver is mounted below /)",
                "Use --secure for services behind TLS",
            ],
            Self::Session(SessionError::Decode { .. }) => vec![
                "The service answered with an unexpected shape; check its wobserver version",
            ],
            Self::Session(SessionError::Transport(TransportError::HttpStatus {
                status: 404,
                ..
            })) => vec![
                "Check the command name",
                "Check that the selected node is known to the service (wobserver nodes)",
            ],
            Self::InvalidArguments(_) => vec![
                "Payloads must be valid JSON, e.g. --payload '{\"limit\": 10}'",
                "Use --help to see expected format",
            ],
            Self::Config(_) | Self::ConfigNotFound(_) => vec![
                "Check the config file path and TOML syntax",
                "WOBSERVER_* environment variables override file settings",
            ],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Session(e) if e.is_connectivity() => ErrorCategory::Connection,
            Self::Session(_) => ErrorCategory::Service,
            Self::InvalidArguments(_) => ErrorCategory::User,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::System,
            Self::Config(_) | Self::ConfigNotFound(_) => ErrorCategory::Config,
        }
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        Self::Session(SessionError::Transport(err))
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Service unreachable
    Connection,
    /// Service answered, but not usefully
    Service,
    /// Bad user input
    User,
    /// Malformed JSON
    Parsing,
    /// Local I/O
    System,
    /// Configuration loading
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::Service => write!(f, "Service"),
            Self::User => write!(f, "User Input"),
            Self::Parsing => write!(f, "Parsing"),
            Self::System => write!(f, "System"),
            Self::Config => write!(f, "Configuration"),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

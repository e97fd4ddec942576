//! Custom error types for unauth-check
//!
//! Provides structured error handling with context propagation
//! and user-friendly error messages.

use thiserror::Error;

/// Main error type for unauth-check operations
#[derive(Error, Debug)]
pub enum UnauthCheckError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Replay transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Raw HTTP message parsing errors
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Scanner errors
    #[error("Scanner error: {0}")]
    Scanner(#[from] ScannerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path}")]
    ReadError { path: String, source: std::io::Error },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {field} - {reason}")]
    ValidationError { field: String, reason: String },
}

/// Replay transport errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Errors raised while analysing raw request/response bytes
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    #[error("Empty message")]
    Empty,

    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    #[error("Malformed status line: {0}")]
    MalformedStatusLine(String),
}

/// Scanner errors
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Traffic import failed: {format} - {reason}")]
    ImportError { format: String, reason: String },
}

impl UnauthCheckError {
    /// Create an error with additional context
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        UnauthCheckError::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            UnauthCheckError::Config(e) => format!("Configuration problem: {}", e.user_hint()),
            UnauthCheckError::Http(e) => format!("Network issue: {}", e.user_hint()),
            UnauthCheckError::Message(e) => format!("Traffic issue: {}", e.user_hint()),
            UnauthCheckError::Scanner(e) => format!("Scanner issue: {}", e.user_hint()),
            UnauthCheckError::Io(e) => format!("File system issue: {}", e),
            UnauthCheckError::WithContext { context, source } => {
                format!("{}: {}", context, source)
            }
        }
    }
}

/// Trait for providing user-friendly hints
pub trait UserHint {
    fn user_hint(&self) -> String;
}

impl UserHint for ConfigError {
    fn user_hint(&self) -> String {
        match self {
            ConfigError::ReadError { path, .. } => {
                format!("Could not read '{}'. Check if the file exists and you have read permissions.", path)
            }
            ConfigError::ParseError(_) => {
                "The configuration file has invalid syntax. Check for TOML formatting errors.".into()
            }
            ConfigError::ValidationError { field, reason } => {
                format!("Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl UserHint for HttpError {
    fn user_hint(&self) -> String {
        match self {
            HttpError::ConnectionError(_) => {
                "Could not connect to the server. Check if it's running and accessible.".into()
            }
            HttpError::Timeout(secs) => {
                format!("Replay timed out after {}s. The server may be slow or unresponsive.", secs)
            }
            HttpError::InvalidUrl(url) => {
                format!("'{}' is not a valid URL. Check the format.", url)
            }
            _ => self.to_string(),
        }
    }
}

impl UserHint for MessageError {
    fn user_hint(&self) -> String {
        match self {
            MessageError::MalformedStatusLine(line) => {
                format!("Response does not start with an HTTP status line: '{}'", line)
            }
            _ => self.to_string(),
        }
    }
}

impl UserHint for ScannerError {
    fn user_hint(&self) -> String {
        match self {
            ScannerError::ImportError { format, reason } => {
                format!("Could not import {} traffic: {}", format, reason)
            }
        }
    }
}

/// User-facing hint for an error that reached the binary, if one of ours is in its chain
pub fn hint(err: &anyhow::Error) -> Option<String> {
    if let Some(e) = err.downcast_ref::<UnauthCheckError>() {
        return Some(e.user_message());
    }
    err.downcast_ref::<ConfigError>().map(UserHint::user_hint)
}

/// Extension trait for adding context to Result types
pub trait ResultExt<T, E> {
    fn with_context<C>(self, context: C) -> Result<T, UnauthCheckError>
    where
        C: Into<String>;
}

impl<T, E> ResultExt<T, E> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<C>(self, context: C) -> Result<T, UnauthCheckError>
    where
        C: Into<String>,
    {
        self.map_err(|e| UnauthCheckError::with_context(context, e))
    }
}

/// Result alias used across the crate
pub type Result<T, E = UnauthCheckError> = std::result::Result<T, E>;

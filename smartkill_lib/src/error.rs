//! Error types for the Victor Smart-Kill API client.

use serde_json::Value;
use thiserror::Error;

/// Base error type for Smart-Kill operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Http(e) => Some(e.status_code),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Raised at construction time when the client is misconfigured
/// (e.g. empty username or password).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised when the token endpoint answers with a success status but no token.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised when the service answers with a non-success status.
#[derive(Error, Debug)]
#[error("{path} returned status {status_code}")]
pub struct HttpError {
    pub status_code: u16,
    pub path: String,
    pub response_data: Option<Value>,
}

impl HttpError {
    pub fn new(status_code: u16, path: impl Into<String>, response_data: Option<Value>) -> Self {
        Self {
            status_code,
            path: path.into(),
            response_data,
        }
    }
}

/// Raised when a response does not fit the expected shape or an entity schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct MappingError {
    pub message: String,
    /// Dotted path of the offending field (`trapstatistics.install_date`).
    pub field: Option<String>,
    /// The raw value that failed to map.
    pub value: Option<Value>,
}

impl MappingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            value: None,
        }
    }

    /// Error attached to a field path, optionally carrying the rejected value.
    pub fn field(path: impl Into<String>, reason: &str, value: Option<&Value>) -> Self {
        let path = path.into();
        let message = match value {
            Some(v) => format!("{}: {} (got {})", path, reason, v),
            None => format!("{}: {}", path, reason),
        };
        Self {
            message,
            field: Some(path),
            value: value.cloned(),
        }
    }

    pub fn unexpected_content() -> Self {
        Self::new("Unexpected response content")
    }

    /// Prefix the field path with a list index, for errors raised on list items.
    pub(crate) fn at_index(self, index: usize) -> Self {
        let field = match &self.field {
            Some(f) => format!("[{}].{}", index, f),
            None => format!("[{}]", index),
        };
        Self {
            message: format!("[{}] {}", index, self.message),
            field: Some(field),
            value: self.value,
        }
    }
}

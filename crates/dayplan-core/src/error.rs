//! Core error types for dayplan-core.
//!
//! Validation failures are the only errors the scheduler itself produces.
//! Chains that do not fit are dropped, never raised.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dayplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Request or window validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Calendar collaborator errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors surfaced to the caller as 4xx responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Wake time is not strictly before sleep time
    #[error("Invalid window: wake time ({wake}) must be before sleep time ({sleep})")]
    InvalidWindow {
        wake: chrono::DateTime<chrono::Utc>,
        sleep: chrono::DateTime<chrono::Utc>,
    },

    /// A request parameter could not be parsed
    #[error("Invalid value for '{field}': {message}")]
    InvalidParameter { field: String, message: String },
}

impl ValidationError {
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home directory could not be resolved or created
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Errors from the calendar-event collaborator.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Reading a local events file failed
    #[error("Failed to read events from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Events payload was not valid
    #[error("Failed to parse events: {0}")]
    Parse(String),

    /// Transport-level failure talking to the calendar service
    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Calendar service answered with a non-success status
    #[error("Calendar service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// User id cannot be used to address the calendar
    #[error("Invalid user id: {0:?}")]
    InvalidUser(String),

    /// Calendar source is misconfigured
    #[error("Calendar source not configured: {0}")]
    NotConfigured(String),
}

impl From<url::ParseError> for CalendarError {
    fn from(err: url::ParseError) -> Self {
        CalendarError::NotConfigured(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

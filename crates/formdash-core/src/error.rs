//! Shared error type across formdash crates.

use thiserror::Error;

/// Stable error classes, used in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Incompatible registration or bad config file.
    Configuration,
    /// Malformed input: label set, metric name, negative delta.
    Validation,
    /// Exposition rendering failed.
    Serialization,
    /// Internal failure (poisoned lock, broken invariant).
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Configuration => "CONFIGURATION",
            ErrorClass::Validation => "VALIDATION",
            ErrorClass::Serialization => "SERIALIZATION",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TelemetryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TelemetryError::Configuration(_) | TelemetryError::UnsupportedVersion => {
                ErrorClass::Configuration
            }
            TelemetryError::Validation(_) => ErrorClass::Validation,
            TelemetryError::Serialization(_) => ErrorClass::Serialization,
            TelemetryError::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<std::fmt::Error> for TelemetryError {
    fn from(_: std::fmt::Error) -> Self {
        TelemetryError::Serialization("formatter error".into())
    }
}

//! Domain error types
//!
//! This module defines the error hierarchy for Cloak. Every failure surfaced by
//! the engine carries an [`ErrorKind`] so callers can tell configuration problems
//! apart from validation failures and per-record processing failures without
//! inspecting message text.

use std::fmt;
use thiserror::Error;

/// Coarse classification of a [`CloakError`]
///
/// The processing-error policy only ever applies to [`ErrorKind::Processing`].
/// Configuration and validation errors always reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or incomplete configuration (rules, parameters, keys)
    Configuration,
    /// Input or output record failed validation
    Validation,
    /// Failure while matching or transforming one record
    Processing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// Main Cloak error type
#[derive(Debug, Error)]
pub enum CloakError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A processor failed on a matched node
    #[error("Processing error in {method} at {path}: {message}")]
    Processing {
        /// Canonical method identifier (e.g. `DATESHIFT`)
        method: String,
        /// Location of the node being transformed
        path: String,
        /// Failure description
        message: String,
    },

    /// Input text could not be parsed into a record
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl CloakError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Processing { .. } | Self::Parse(_) | Self::Io(_) => ErrorKind::Processing,
        }
    }

    /// Whether this error must bypass the processing-error policy
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Build a processing error for a method; the path is filled in by the engine
    pub fn processing(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            method: method.into(),
            path: String::new(),
            message: message.into(),
        }
    }

    /// Attach the node location to a processing error
    pub(crate) fn at_path(self, location: &str) -> Self {
        match self {
            Self::Processing {
                method,
                path,
                message,
            } if path.is_empty() => Self::Processing {
                method,
                path: location.to_string(),
                message,
            },
            other => other,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CloakError {
    fn from(err: std::io::Error) -> Self {
        CloakError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CloakError {
    fn from(err: serde_json::Error) -> Self {
        CloakError::Parse(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CloakError {
    fn from(err: toml::de::Error) -> Self {
        CloakError::Configuration(format!("TOML parse error: {err}"))
    }
}

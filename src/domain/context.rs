//! Error context extension trait
//!
//! This module provides a context extension trait similar to `anyhow::Context`
//! that works with `Result<T, CloakError>`. Context is prefixed to the error
//! message and the error keeps its kind, so a configuration error with context
//! is still a configuration error.
//!
//! # Examples
//!
//! ```rust
//! use cloak::domain::{CloakError, ErrorKind, Result};
//! use cloak::domain::context::ResultExt;
//!
//! fn read_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .context(format!("Failed to read file: {}", path))
//! }
//!
//! let err = read_file("/does/not/exist.json").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Processing);
//! assert!(err.to_string().contains("Failed to read file"));
//! ```

use crate::domain::errors::CloakError;
use crate::domain::result::Result;
use std::fmt::Display;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// The context is evaluated eagerly; use `.with_context()` if it is
    /// expensive to compute.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CloakError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| prefix(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| prefix(e.into(), &f()))
    }
}

fn prefix(error: CloakError, context: &dyn Display) -> CloakError {
    match error {
        CloakError::Configuration(msg) => CloakError::Configuration(format!("{context}: {msg}")),
        CloakError::Validation(msg) => CloakError::Validation(format!("{context}: {msg}")),
        CloakError::Parse(msg) => CloakError::Parse(format!("{context}: {msg}")),
        CloakError::Io(msg) => CloakError::Io(format!("{context}: {msg}")),
        CloakError::Processing {
            method,
            path,
            message,
        } => CloakError::Processing {
            method,
            path,
            message: format!("{context}: {message}"),
        },
    }
}

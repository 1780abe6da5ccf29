//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output on stderr
//! - JSON-formatted file logs with rotation
//! - Per-engine dispatchers for hosts that do not want a global subscriber
//!
//! Log events carry record metadata (resource type, file, counts) and never
//! element values.
//!
//! # Example
//!
//! ```no_run
//! use cloak::logging::init_logging;
//! use cloak::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{build_dispatch, init_logging, LoggingGuard};

/// Log the start of a batch run
///
/// # Example
///
/// ```no_run
/// use cloak::log_batch_start;
///
/// log_batch_start!("data/in", "data/out", 12);
/// ```
#[macro_export]
macro_rules! log_batch_start {
    ($input:expr, $output:expr, $files:expr) => {
        tracing::info!(
            input = %$input,
            output = %$output,
            files = $files,
            "Starting anonymization run"
        );
    };
}

/// Log the completion of a batch run
///
/// # Example
///
/// ```no_run
/// use cloak::log_batch_complete;
/// use std::time::Duration;
///
/// log_batch_complete!(120, 3, Duration::from_secs(4));
/// ```
#[macro_export]
macro_rules! log_batch_complete {
    ($records:expr, $skipped:expr, $duration:expr) => {
        tracing::info!(
            records = $records,
            skipped = $skipped,
            duration_ms = $duration.as_millis() as u64,
            "Anonymization run completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use cloak::log_error_with_context;
/// use cloak::domain::CloakError;
///
/// let error = CloakError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

//! CLI command implementations
//!
//! Commands return a process exit code: 0 on success, 1 when any file
//! failed, 2 on configuration errors.

pub mod anonymize;
pub mod validate;

//! Folder and bulk anonymization
//!
//! - [`runner`] - file discovery, per-scope engines and concurrent processing
//! - [`summary`] - run counters and reporting

pub mod runner;
pub mod summary;

pub use runner::{BatchOptions, FolderAnonymizer};
pub use summary::{BatchSummary, FileError, FileReport};

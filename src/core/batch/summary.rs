//! Run summary and reporting
//!
//! This module defines structures for tracking and reporting the results of
//! a folder anonymization run.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one successfully processed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    /// Records read from the file
    pub records: usize,
    /// Records written to the output
    pub anonymized: usize,
    /// Records dropped under the `skip` policy
    pub dropped: usize,
}

/// A file that could not be processed
#[derive(Debug, Clone)]
pub struct FileError {
    /// Input file
    pub file: PathBuf,
    /// Error message
    pub message: String,
}

impl FileError {
    /// Create a new file error
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Summary of an anonymization run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Input files discovered
    pub files_total: usize,

    /// Files anonymized and written
    pub files_processed: usize,

    /// Files skipped because their output already existed
    pub files_skipped_existing: usize,

    /// Files that failed
    pub files_failed: usize,

    /// Records read
    pub records_total: usize,

    /// Records written
    pub records_anonymized: usize,

    /// Records dropped under the `skip` policy
    pub records_dropped: usize,

    /// Duration of the run
    pub duration: Duration,

    /// Errors encountered, one per failed file
    pub errors: Vec<FileError>,
}

impl BatchSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a processed file
    pub fn add_file(&mut self, report: &FileReport) {
        self.files_processed += 1;
        self.records_total += report.records;
        self.records_anonymized += report.anonymized;
        self.records_dropped += report.dropped;
    }

    /// Record a file skipped because its output exists
    pub fn add_skipped_existing(&mut self) {
        self.files_skipped_existing += 1;
    }

    /// Record a failed file
    pub fn add_error(&mut self, error: FileError) {
        self.files_failed += 1;
        self.errors.push(error);
    }

    /// Check if the run was successful (no failed files)
    pub fn is_successful(&self) -> bool {
        self.files_failed == 0 && self.errors.is_empty()
    }

    /// Share of attempted files that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.files_processed + self.files_failed;
        if attempted == 0 {
            return 100.0;
        }
        (self.files_processed as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            files_total = self.files_total,
            files_processed = self.files_processed,
            files_skipped_existing = self.files_skipped_existing,
            files_failed = self.files_failed,
            records_total = self.records_total,
            records_anonymized = self.records_anonymized,
            records_dropped = self.records_dropped,
            duration_ms = self.duration.as_millis() as u64,
            success_rate = format!("{:.2}%", self.success_rate()),
            "Anonymization summary"
        );

        for error in &self.errors {
            tracing::warn!(
                file = %error.file.display(),
                message = %error.message,
                "File failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_creation() {
        let summary = BatchSummary::new();
        assert_eq!(summary.files_total, 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.is_successful());
        assert_eq!(summary.success_rate(), 100.0);
    }

    #[test]
    fn test_add_file_accumulates_records() {
        let mut summary = BatchSummary::new();
        summary.add_file(&FileReport {
            records: 10,
            anonymized: 9,
            dropped: 1,
        });
        summary.add_file(&FileReport {
            records: 1,
            anonymized: 1,
            dropped: 0,
        });

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.records_total, 11);
        assert_eq!(summary.records_anonymized, 10);
        assert_eq!(summary.records_dropped, 1);
    }

    #[test]
    fn test_errors_make_run_unsuccessful() {
        let mut summary = BatchSummary::new();
        summary.add_file(&FileReport::default());
        summary.add_error(FileError::new("in/bad.json", "Parse error"));

        assert!(!summary.is_successful());
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_with_duration() {
        let summary = BatchSummary::new().with_duration(Duration::from_secs(3));
        assert_eq!(summary.duration, Duration::from_secs(3));
    }
}

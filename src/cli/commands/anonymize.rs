//! Anonymize command implementation
//!
//! This module implements the `anonymize` command, which runs the configured
//! rules over a folder of FHIR files.

use crate::anonymization::AnonymizationSettings;
use crate::config::load_config;
use crate::core::batch::{BatchOptions, FolderAnonymizer};
use crate::domain::ErrorKind;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the anonymize command
#[derive(Args, Debug, Clone)]
pub struct AnonymizeArgs {
    /// Folder holding the input files
    #[arg(short, long)]
    pub input_dir: PathBuf,

    /// Folder to write anonymized files to
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Read NDJSON bulk files (*.ndjson) instead of single resources (*.json)
    #[arg(long)]
    pub bulk: bool,

    /// Include sub-folders
    #[arg(long)]
    pub recursive: bool,

    /// Skip files whose output already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// Validate each record before anonymizing it
    #[arg(long)]
    pub validate_input: bool,

    /// Validate each anonymized record
    #[arg(long)]
    pub validate_output: bool,

    /// Pretty-print single-resource output
    #[arg(long)]
    pub pretty: bool,

    /// Number of files processed at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

impl AnonymizeArgs {
    fn batch_options(&self) -> BatchOptions {
        let mut options = BatchOptions::new(&self.input_dir, &self.output_dir);
        options.bulk = self.bulk;
        options.recursive = self.recursive;
        options.skip_existing = self.skip_existing;
        options.settings = AnonymizationSettings::default()
            .with_validate_input(self.validate_input)
            .with_validate_output(self.validate_output)
            .with_pretty_output(self.pretty);
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency.max(1);
        }
        options
    }

    fn same_folder(&self) -> bool {
        match (self.input_dir.canonicalize(), self.output_dir.canonicalize()) {
            (Ok(input), Ok(output)) => input == output,
            _ => false,
        }
    }

    /// Execute the anonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Loading configuration");

        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if !self.input_dir.is_dir() {
            eprintln!("Input folder not found: {}", self.input_dir.display());
            return Ok(2);
        }
        if self.same_folder() {
            eprintln!("Output folder must differ from the input folder");
            return Ok(2);
        }

        println!("🔒 Anonymizing {}", self.input_dir.display());
        println!("  Rules: {}", config.rules.len());
        println!("  Date shift scope: {}", config.parameters.date_shift_scope);
        println!("  Processing errors: {}", config.processing_error);
        println!();

        let runner = FolderAnonymizer::new(config, self.batch_options());
        let summary = match runner.run().await {
            Ok(summary) => summary,
            Err(e) if e.kind() == ErrorKind::Configuration => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
            Err(e) => {
                eprintln!("Anonymization failed: {e}");
                return Ok(1);
            }
        };
        summary.log_summary();

        println!("📊 Anonymization Summary:");
        println!("  Files Found: {}", summary.files_total);
        println!("  Files Written: {}", summary.files_processed);
        println!("  Files Skipped (existing): {}", summary.files_skipped_existing);
        println!("  Files Failed: {}", summary.files_failed);
        println!("  Records Read: {}", summary.records_total);
        println!("  Records Anonymized: {}", summary.records_anonymized);
        println!("  Records Dropped: {}", summary.records_dropped);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if summary.is_successful() {
            println!("✅ Anonymization completed successfully!");
            Ok(0)
        } else {
            println!("⚠️  Errors encountered:");
            for error in &summary.errors {
                println!("  - {}: {}", error.file.display(), error.message);
            }
            println!();
            println!("⚠️  Anonymization completed with failures");
            Ok(1)
        }
    }
}

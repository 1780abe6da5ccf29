//! Core orchestration for Cloak.
//!
//! The library boundary is the [`AnonymizerEngine`](crate::anonymization::AnonymizerEngine);
//! this module drives engines over folders of FHIR files.
//!
//! # Modules
//!
//! - [`batch`] - folder runs over `*.json` and `*.ndjson` files
//!
//! # Run Workflow
//!
//! 1. **Discover**: list input files, optionally recursively
//! 2. **Build engines**: one per file, per folder or per run, following the date-shift scope
//! 3. **Anonymize**: files run concurrently on the blocking pool
//! 4. **Write**: outputs mirror the input layout; dropped records are not written
//! 5. **Report**: a [`BatchSummary`](batch::BatchSummary) with file and record counts
//!
//! # Example
//!
//! ```rust,no_run
//! use cloak::config::load_config;
//! use cloak::core::batch::{BatchOptions, FolderAnonymizer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("cloak.toml")?;
//! let runner = FolderAnonymizer::new(config, BatchOptions::new("data/in", "data/out"));
//! let summary = runner.run().await?;
//!
//! println!("Records: {}", summary.records_total);
//! println!("Dropped: {}", summary.records_dropped);
//! # Ok(())
//! # }
//! ```

pub mod batch;

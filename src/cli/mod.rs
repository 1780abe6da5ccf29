//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Cloak using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Cloak - rule-driven anonymization for FHIR records
#[derive(Parser, Debug)]
#[command(name = "cloak")]
#[command(version, about, long_about = None)]
#[command(author = "Cloak Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "cloak.toml", env = "CLOAK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLOAK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymize a folder of FHIR JSON or NDJSON files
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

//! Validate config command implementation
//!
//! This module implements the `validate-config` command: it loads the
//! configuration, builds an engine from it and prints the rule table.

use crate::anonymization::AnonymizerEngine;
use crate::config::{load_config, DateShiftScope};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let mut config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // File and folder scopes need a name; use a placeholder so the rest of
        // the configuration can still be checked
        if config.parameters.date_shift_scope != DateShiftScope::Resource
            && config.parameters.date_shift_key_prefix.is_none()
        {
            config.parameters.date_shift_key_prefix = Some("validate-config".to_string());
        }

        let engine = match AnonymizerEngine::new(config.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Processing Errors: {}", engine.policy());
        println!("  Date Shift Scope: {}", config.parameters.date_shift_scope);
        println!("  Local Logging: {}", config.logging.local_enabled);
        println!("  Rules ({}):", engine.rules().len());
        for (index, rule) in engine.rules().iter().enumerate() {
            println!("    {:>3}. {:<40} {}", index + 1, rule.selector(), rule.method());
        }
        println!();
        Ok(0)
    }
}

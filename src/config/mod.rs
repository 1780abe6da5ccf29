//! Configuration management for Cloak.
//!
//! Cloak reads its rules and method parameters from a TOML or JSON file with
//! support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CLOAK_*` environment overrides for keys and policies
//! - Validation of the file shape on load
//!
//! # Example Configuration
//!
//! ```toml
//! processing_error = "skip"
//!
//! [[rules]]
//! path = "Patient.birthDate"
//! method = "dateShift"
//!
//! [[rules]]
//! path = "Patient.name"
//! method = "redact"
//!
//! [[rules]]
//! path = "Resource.id"
//! method = "cryptoHash"
//!
//! [parameters]
//! date_shift_key = "${CLOAK_DATE_SHIFT_KEY}"
//! date_shift_scope = "file"
//! crypto_hash_key = "${CLOAK_CRYPTO_HASH_KEY}"
//! enable_partial_dates_for_redact = true
//! ```
//!
//! JSON files accept the same structure; `fhirPathRules`, `dateShiftKey` and
//! the other camelCase names are accepted as aliases.

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    AnonymizerConfig, DateShiftScope, LoggingConfig, ParameterConfig, ProcessingErrorPolicy,
    RuleConfig,
};
pub use secret::{secret_key, KeyMaterial, SecretKey};

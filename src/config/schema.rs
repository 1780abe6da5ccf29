//! Configuration schema types
//!
//! This module defines the anonymizer configuration as it appears in TOML or
//! JSON files. Rule methods are kept as raw strings here; they are parsed into
//! method identifiers when an engine is built so an unknown method surfaces as
//! a configuration error from engine construction.

use crate::config::SecretKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// What to do when a record fails during rule matching or transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingErrorPolicy {
    /// Surface the error to the caller
    #[default]
    #[serde(alias = "raise")]
    Throw,
    /// Drop the record: the call returns no result
    Skip,
}

impl FromStr for ProcessingErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "throw" | "raise" => Ok(Self::Throw),
            "skip" => Ok(Self::Skip),
            _ => Err(format!(
                "Invalid processing error policy: {s}. Expected 'throw' or 'skip'"
            )),
        }
    }
}

impl fmt::Display for ProcessingErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throw => write!(f, "throw"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Granularity at which the date-shift key is held constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateShiftScope {
    /// Every resource gets its own offset (keyed by resource type and id)
    #[default]
    Resource,
    /// All resources in one file share an offset
    File,
    /// All resources in one folder share an offset
    Folder,
}

impl FromStr for DateShiftScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resource" => Ok(Self::Resource),
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            _ => Err(format!(
                "Invalid date shift scope: {s}. Expected 'resource', 'file' or 'folder'"
            )),
        }
    }
}

impl fmt::Display for DateShiftScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource => write!(f, "resource"),
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// Main anonymizer configuration
///
/// This is the root configuration structure that maps to the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnonymizerConfig {
    /// Ordered rules; earlier rules take precedence
    #[serde(default, alias = "fhirPathRules")]
    pub rules: Vec<RuleConfig>,

    /// Per-method parameters (keys, scope, redaction switches)
    #[serde(default)]
    pub parameters: ParameterConfig,

    /// Processing error policy
    #[serde(default, alias = "processingError")]
    pub processing_error: ProcessingErrorPolicy,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnonymizerConfig {
    /// Validates the configuration shape
    ///
    /// Method names and selectors are checked when the engine is built.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|e| format!("rules[{index}]: {e}"))?;
        }
        self.parameters.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// One rule as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Path selector, e.g. `Patient.birthDate`
    pub path: String,

    /// Method name, case-insensitive (e.g. `redact`, `dateShift`)
    pub method: String,

    /// Method-specific options (`replaceWith`, `span`, `cases`, ...)
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl RuleConfig {
    /// Create a rule without options
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            options: Map::new(),
        }
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("path cannot be empty".to_string());
        }
        if self.method.trim().is_empty() {
            return Err(format!("method cannot be empty for path '{}'", self.path));
        }
        Ok(())
    }
}

/// Method parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterConfig {
    /// Key used to derive date-shift offsets
    #[serde(default, alias = "dateShiftKey")]
    pub date_shift_key: Option<SecretKey>,

    /// Scope of the date-shift key
    #[serde(default, alias = "dateShiftScope")]
    pub date_shift_scope: DateShiftScope,

    /// Pre-resolved key prefix; overwritten when an engine is built from a file context
    #[serde(default, alias = "dateShiftKeyPrefix")]
    pub date_shift_key_prefix: Option<String>,

    /// HMAC key for cryptoHash
    #[serde(default, alias = "cryptoHashKey")]
    pub crypto_hash_key: Option<SecretKey>,

    /// Key for encrypt
    #[serde(default, alias = "encryptKey")]
    pub encrypt_key: Option<SecretKey>,

    /// Keep the year of redacted dates
    #[serde(default, alias = "enablePartialDatesForRedact")]
    pub enable_partial_dates_for_redact: bool,

    /// Keep the first three digits of redacted postal codes
    #[serde(default, alias = "enablePartialZipCodesForRedact")]
    pub enable_partial_zip_codes_for_redact: bool,

    /// Three-digit postal prefixes that must be fully masked
    #[serde(default, alias = "restrictedZipCodeTabulationAreas")]
    pub restricted_zip_code_tabulation_areas: Vec<String>,
}

impl ParameterConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(prefix) = &self.date_shift_key_prefix {
            if prefix.contains(['/', '\\']) {
                return Err(format!(
                    "parameters.date_shift_key_prefix must be a base name, got '{prefix}'"
                ));
            }
        }
        for area in &self.restricted_zip_code_tabulation_areas {
            if area.len() != 3 || !area.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!(
                    "Invalid restricted zip code tabulation area '{area}'. Expected three digits"
                ));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    /// Console-only logging
    pub fn console_only() -> Self {
        Self {
            local_enabled: false,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

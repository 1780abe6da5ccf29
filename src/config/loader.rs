//! Configuration loader with TOML/JSON parsing and environment variable overrides

use super::schema::AnonymizerConfig;
use super::secret::secret_key;
use crate::domain::errors::CloakError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML or JSON file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses JSON (`.json` extension) or TOML (anything else)
/// 4. Applies environment variable overrides (`CLOAK_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Every failure is reported as [`CloakError::Configuration`].
///
/// # Examples
///
/// ```no_run
/// use cloak::config::loader::load_config;
///
/// let config = load_config("cloak.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AnonymizerConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CloakError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CloakError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let mut config = parse_config(&contents, is_json)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CloakError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    tracing::debug!(
        path = %path.display(),
        rules = config.rules.len(),
        processing_error = %config.processing_error,
        date_shift_scope = %config.parameters.date_shift_scope,
        "Configuration loaded"
    );

    Ok(config)
}

/// Parses configuration text after environment substitution
pub fn parse_config(contents: &str, is_json: bool) -> Result<AnonymizerConfig> {
    let contents = substitute_env_vars(contents)?;

    if is_json {
        serde_json::from_str(&contents)
            .map_err(|e| CloakError::Configuration(format!("Failed to parse JSON: {}", e)))
    } else {
        toml::from_str(&contents)
            .map_err(|e| CloakError::Configuration(format!("Failed to parse TOML: {}", e)))
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("environment variable pattern is valid")
    })
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Lines starting with `#` are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed_line = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CloakError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the `CLOAK_*` prefix
fn apply_env_overrides(config: &mut AnonymizerConfig) -> Result<()> {
    if let Ok(val) = std::env::var("CLOAK_PROCESSING_ERROR") {
        config.processing_error = val.parse().map_err(CloakError::Configuration)?;
    }
    if let Ok(val) = std::env::var("CLOAK_DATE_SHIFT_SCOPE") {
        config.parameters.date_shift_scope = val.parse().map_err(CloakError::Configuration)?;
    }
    if let Ok(val) = std::env::var("CLOAK_DATE_SHIFT_KEY") {
        config.parameters.date_shift_key = Some(secret_key(val));
    }
    if let Ok(val) = std::env::var("CLOAK_CRYPTO_HASH_KEY") {
        config.parameters.crypto_hash_key = Some(secret_key(val));
    }
    if let Ok(val) = std::env::var("CLOAK_ENCRYPT_KEY") {
        config.parameters.encrypt_key = Some(secret_key(val));
    }
    if let Ok(val) = std::env::var("CLOAK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CLOAK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    Ok(())
}

//! Record validation before and after anonymization

use crate::domain::{CloakError, Resource, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Checks a record's structure
///
/// Implementations must be shareable across threads; one validator serves
/// every call on an engine.
pub trait RecordValidator: Send + Sync {
    /// Validate a record before it is transformed
    fn validate_input(&self, resource: &Resource) -> Result<()>;

    /// Validate a transformed record
    fn validate_output(&self, resource: &Resource) -> Result<()> {
        self.validate_input(resource)
    }
}

fn resource_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z]*$").expect("resource type pattern is valid"))
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9\-.]{1,64}$").expect("id pattern is valid"))
}

/// Structural validator for FHIR JSON
///
/// Checks the rules every FHIR JSON resource must follow: a capitalized
/// `resourceType`, a well-formed `id`, and no empty objects, arrays or
/// strings. Nested resources are checked the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    /// Create a structural validator
    pub fn new() -> Self {
        Self
    }

    fn check_resource(&self, body: &serde_json::Map<String, Value>, location: &str) -> Result<()> {
        match body.get("resourceType") {
            Some(Value::String(rt)) if resource_type_pattern().is_match(rt) => {}
            Some(other) => {
                return Err(CloakError::Validation(format!(
                    "{location}: invalid resourceType {other}"
                )))
            }
            None => {
                return Err(CloakError::Validation(format!(
                    "{location}: missing resourceType"
                )))
            }
        }

        match body.get("id") {
            None => {}
            Some(Value::String(id)) if id_pattern().is_match(id) => {}
            Some(other) => {
                return Err(CloakError::Validation(format!(
                    "{location}.id: invalid resource id {other}"
                )))
            }
        }
        Ok(())
    }

    fn check_value(&self, value: &Value, location: &str) -> Result<()> {
        match value {
            Value::String(s) if s.trim().is_empty() => Err(CloakError::Validation(format!(
                "{location}: empty string"
            ))),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(CloakError::Validation(format!("{location}: empty array")));
                }
                for (index, item) in items.iter().enumerate() {
                    self.check_value(item, &format!("{location}[{index}]"))?;
                }
                Ok(())
            }
            Value::Object(map) => {
                if map.is_empty() {
                    return Err(CloakError::Validation(format!("{location}: empty object")));
                }
                if map.contains_key("resourceType") {
                    self.check_resource(map, location)?;
                }
                for (field, child) in map {
                    self.check_value(child, &format!("{location}.{field}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl RecordValidator for StructuralValidator {
    fn validate_input(&self, resource: &Resource) -> Result<()> {
        let location = resource.resource_type().to_string();
        self.check_resource(resource.as_map(), &location)?;
        for (field, value) in resource.as_map() {
            self.check_value(value, &format!("{location}.{field}"))?;
        }
        Ok(())
    }
}

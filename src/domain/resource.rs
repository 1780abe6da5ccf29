//! FHIR resource domain model
//!
//! A [`Resource`] is one structured clinical record: a JSON object carrying a
//! string `resourceType`. The type is deliberately thin; schema knowledge lives
//! in validators, not here.

use super::errors::CloakError;
use super::result::Result;
use serde_json::{Map, Value};

/// A single FHIR resource in JSON form
///
/// # Examples
///
/// ```
/// use cloak::domain::Resource;
/// use serde_json::json;
///
/// let patient = Resource::from_value(json!({
///     "resourceType": "Patient",
///     "id": "example",
///     "birthDate": "1980-05-01"
/// }))
/// .unwrap();
///
/// assert_eq!(patient.resource_type(), "Patient");
/// assert_eq!(patient.id(), Some("example"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    body: Map<String, Value>,
}

impl Resource {
    /// Wraps a JSON value, rejecting anything that is not a typed resource object
    ///
    /// # Errors
    ///
    /// Returns [`CloakError::Parse`] if the value is not an object or lacks a
    /// string `resourceType`
    pub fn from_value(value: Value) -> Result<Self> {
        let body = match value {
            Value::Object(map) => map,
            other => {
                return Err(CloakError::Parse(format!(
                    "Expected a JSON object for a FHIR resource, found {}",
                    json_type_name(&other)
                )))
            }
        };

        match body.get("resourceType") {
            Some(Value::String(rt)) if !rt.is_empty() => Ok(Self { body }),
            Some(_) => Err(CloakError::Parse(
                "resourceType must be a non-empty string".to_string(),
            )),
            None => Err(CloakError::Parse(
                "Resource is missing resourceType".to_string(),
            )),
        }
    }

    /// The resource type (e.g. `Patient`)
    pub fn resource_type(&self) -> &str {
        self.body
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The logical id, if present
    pub fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(Value::as_str)
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Look up a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Convert back into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    /// Clone into a plain JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

impl TryFrom<Value> for Resource {
    type Error = CloakError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        resource.into_value()
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

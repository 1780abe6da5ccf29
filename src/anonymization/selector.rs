//! Path selectors
//!
//! A selector names a resource type followed by field segments:
//!
//! - `Patient.birthDate` - the `birthDate` of every Patient resource
//! - `Resource.id` - the `id` of every resource, whatever its type
//! - `Patient.name.given` - every given name in every name
//! - `Observation.value` - the choice element `value[x]` (`valueQuantity`, `valueString`, ...)
//! - `Patient.*` - every top-level element of a Patient except `resourceType`
//! - `Patient` - the whole resource
//!
//! Resource roots are found anywhere in the tree, so `Patient.birthDate` also
//! reaches patients inside `Bundle.entry.resource` or `contained`.

use crate::domain::element::RESOURCE_TYPE_FIELD;
use crate::domain::{CloakError, ElementNode, Result};
use std::fmt;
use std::str::FromStr;

const ANY_RESOURCE: &str = "Resource";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Wildcard,
}

impl Segment {
    fn matches(&self, node: &ElementNode) -> bool {
        if node.is_resource_type_marker() {
            return false;
        }
        match self {
            Segment::Wildcard => true,
            Segment::Field(field) => {
                let name = node.name();
                name == field
                    || name
                        .strip_prefix(field.as_str())
                        .and_then(|rest| rest.chars().next())
                        .is_some_and(|c| c.is_ascii_uppercase())
            }
        }
    }
}

/// A parsed path selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSelector {
    raw: String,
    resource_type: Option<String>,
    segments: Vec<Segment>,
}

impl PathSelector {
    /// Parse a selector expression
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty selector, an invalid
    /// resource type, or an invalid field segment
    pub fn parse(expression: &str) -> Result<Self> {
        let raw = expression.trim();
        if raw.is_empty() {
            return Err(CloakError::Configuration(
                "Path selector cannot be empty".to_string(),
            ));
        }

        let mut parts = raw.split('.');
        let type_part = parts.next().unwrap_or_default();
        if !is_resource_type_name(type_part) {
            return Err(CloakError::Configuration(format!(
                "Invalid path selector '{raw}': '{type_part}' is not a resource type"
            )));
        }

        let segments = parts
            .map(|part| match part {
                "*" => Ok(Segment::Wildcard),
                RESOURCE_TYPE_FIELD => Err(CloakError::Configuration(format!(
                    "Invalid path selector '{raw}': resourceType cannot be anonymized"
                ))),
                field if is_field_name(field) => Ok(Segment::Field(field.to_string())),
                other => Err(CloakError::Configuration(format!(
                    "Invalid path selector '{raw}': bad segment '{other}'"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let resource_type = (type_part != ANY_RESOURCE).then(|| type_part.to_string());

        Ok(Self {
            raw: raw.to_string(),
            resource_type,
            segments,
        })
    }

    /// The selector text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Locations (child-index paths from `root`) of every matching node, in document order
    pub fn select(&self, root: &ElementNode) -> Vec<Vec<usize>> {
        let mut matches = Vec::new();

        for root_path in root.resource_roots() {
            let Some(resource) = root.get(&root_path) else {
                continue;
            };
            let type_matches = match (&self.resource_type, resource.resource_type()) {
                (None, _) => true,
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) => false,
            };
            if !type_matches {
                continue;
            }

            let mut frontier: Vec<(Vec<usize>, &ElementNode)> = vec![(root_path, resource)];
            for segment in &self.segments {
                let mut next = Vec::new();
                for (path, node) in &frontier {
                    for (index, child) in node.children().iter().enumerate() {
                        if segment.matches(child) {
                            let mut child_path = path.clone();
                            child_path.push(index);
                            next.push((child_path, child));
                        }
                    }
                }
                frontier = next;
                if frontier.is_empty() {
                    break;
                }
            }

            matches.extend(frontier.into_iter().map(|(path, _)| path));
        }

        matches
    }
}

impl FromStr for PathSelector {
    type Err = CloakError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_resource_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

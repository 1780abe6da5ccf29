//! Substitute processor - replaces a node with a fixed value

use super::{PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::domain::{CloakError, ElementNode, Result};
use serde_json::Value;

/// Rule option holding the replacement
pub const REPLACE_WITH_OPTION: &str = "replaceWith";

/// Replaces a primitive with `replaceWith`, or a complex node with the
/// object given in `replaceWith`
pub struct SubstituteProcessor;

impl SubstituteProcessor {
    /// Create a new substitute processor
    pub fn new() -> Self {
        Self
    }

    fn replacement(options: &RuleOptions) -> Result<&Value> {
        match options.get(REPLACE_WITH_OPTION) {
            None | Some(Value::Null) => Err(CloakError::Configuration(format!(
                "substitute requires the '{REPLACE_WITH_OPTION}' option"
            ))),
            Some(Value::Array(_)) => Err(CloakError::Configuration(format!(
                "'{REPLACE_WITH_OPTION}' must be a primitive or an object, not an array"
            ))),
            Some(value) => Ok(value),
        }
    }
}

impl Default for SubstituteProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for SubstituteProcessor {
    fn method(&self) -> MethodId {
        MethodId::Substitute
    }

    fn prepare(&self, options: &RuleOptions) -> Result<PreparedOptions> {
        Self::replacement(options).map(|value| PreparedOptions::Substitute(value.clone()))
    }

    fn process(
        &self,
        node: &mut ElementNode,
        context: &ProcessContext<'_>,
        options: &PreparedOptions,
    ) -> Result<()> {
        let PreparedOptions::Substitute(replacement) = options else {
            return Err(PreparedOptions::mismatch(MethodId::Substitute));
        };
        match replacement {
            Value::Object(_) => {
                let substituted = ElementNode::from_json(node.name(), replacement);
                node.replace_content(substituted);
            }
            primitive if node.is_primitive() => node.set_value(primitive.clone()),
            _ => {
                return Err(CloakError::processing(
                    MethodId::Substitute.canonical(),
                    format!(
                        "Cannot substitute complex element {} with a primitive value",
                        context.location
                    ),
                ))
            }
        }
        Ok(())
    }
}

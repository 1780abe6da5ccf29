//! Keep processor - leaves the node as it is

use super::{PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::MethodId;
use crate::domain::{ElementNode, Result};

/// Keeps a node unchanged and shields it from later, broader rules
pub struct KeepProcessor;

impl KeepProcessor {
    /// Create a new keep processor
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeepProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for KeepProcessor {
    fn method(&self) -> MethodId {
        MethodId::Keep
    }

    fn process(
        &self,
        _node: &mut ElementNode,
        _context: &ProcessContext<'_>,
        _options: &PreparedOptions,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keep_is_idempotent() {
        let processor = KeepProcessor::new();
        let original = ElementNode::from_json("name", &json!({"family": "Chalmers"}));
        let context = ProcessContext {
            resource_type: "Patient",
            resource_id: None,
            location: "Patient.name[0]",
        };

        let mut node = original.clone();
        processor
            .process(&mut node, &context, &PreparedOptions::None)
            .unwrap();
        assert_eq!(node, original);
        processor
            .process(&mut node, &context, &PreparedOptions::None)
            .unwrap();
        assert_eq!(node, original);
    }
}

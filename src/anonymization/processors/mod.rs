//! Anonymization processors
//!
//! One processor per [`MethodId`]. Processors are built once per engine with
//! their keys and switches, then invoked for every node a rule matches. They
//! must not keep mutable state between calls; the engine shares them across
//! threads.

pub mod crypto_hash;
pub mod date_shift;
pub mod encrypt;
pub mod generalize;
pub mod keep;
pub mod perturb;
pub mod redact;
pub mod substitute;

pub use crypto_hash::CryptoHashProcessor;
pub use date_shift::{DateShiftParameters, DateShiftProcessor};
pub use encrypt::EncryptProcessor;
pub use generalize::{GeneralizeOptions, GeneralizeProcessor};
pub use keep::KeepProcessor;
pub use perturb::{PerturbOptions, PerturbProcessor};
pub use redact::{RedactParameters, RedactProcessor};
pub use substitute::SubstituteProcessor;

use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::domain::{CloakError, ElementNode, Result};
use serde_json::Value;

/// Information about the node being transformed
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Type of the enclosing resource
    pub resource_type: &'a str,
    /// Id of the enclosing resource, if it has one
    pub resource_id: Option<&'a str>,
    /// Human-readable location of the node
    pub location: &'a str,
}

/// Rule options in the form a processor consumes them
///
/// Produced once per rule by [`Processor::prepare`] while the engine is built
/// and handed to every [`Processor::process`] call for that rule.
#[derive(Debug, Clone, Default)]
pub enum PreparedOptions {
    /// The method takes no options
    #[default]
    None,
    /// Replacement value for `substitute`
    Substitute(Value),
    /// Span, range type and rounding for `perturb`
    Perturb(PerturbOptions),
    /// Compiled cases for `generalize`
    Generalize(GeneralizeOptions),
}

impl PreparedOptions {
    /// Error for a rule whose options were not prepared by its own processor
    pub(crate) fn mismatch(method: MethodId) -> CloakError {
        CloakError::Configuration(format!("{method} rule options were not prepared"))
    }
}

/// Trait for anonymization method implementations
pub trait Processor: Send + Sync {
    /// Method this processor implements
    fn method(&self) -> MethodId;

    /// Check that a rule using this processor can run and parse its options
    ///
    /// Called once per rule while the engine is built. Fails when a required
    /// key is missing or the options are malformed.
    fn prepare(&self, _options: &RuleOptions) -> Result<PreparedOptions> {
        Ok(PreparedOptions::None)
    }

    /// Transform a matched node in place
    fn process(
        &self,
        node: &mut ElementNode,
        context: &ProcessContext<'_>,
        options: &PreparedOptions,
    ) -> Result<()>;
}

/// Text form of a primitive value, as fed to hashing and encryption
pub(crate) fn primitive_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Processor registry - one processor per method

use crate::anonymization::context::ResolvedContext;
use crate::anonymization::processors::{
    CryptoHashProcessor, DateShiftParameters, DateShiftProcessor, EncryptProcessor,
    GeneralizeProcessor, KeepProcessor, PerturbProcessor, Processor, RedactParameters,
    RedactProcessor, SubstituteProcessor,
};
use crate::anonymization::rules::MethodId;
use crate::config::{ParameterConfig, SecretKey};
use crate::domain::{CloakError, Result};
use secrecy::ExposeSecret;
use std::collections::HashMap;

/// Maps every [`MethodId`] to its processor
///
/// Built once per engine from the configured parameters and the resolved
/// context, then only read.
pub struct ProcessorRegistry {
    processors: HashMap<MethodId, Box<dyn Processor>>,
}

impl ProcessorRegistry {
    /// Build all eight processors
    ///
    /// Keys are optional here; a rule that needs a missing key is rejected when
    /// the rule set is prepared.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a key is present but blank
    pub fn build(parameters: &ParameterConfig, context: &ResolvedContext) -> Result<Self> {
        check_not_blank("date_shift_key", parameters.date_shift_key.as_ref())?;
        check_not_blank("crypto_hash_key", parameters.crypto_hash_key.as_ref())?;
        check_not_blank("encrypt_key", parameters.encrypt_key.as_ref())?;

        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(DateShiftProcessor::new(DateShiftParameters::new(
                parameters, context,
            ))),
            Box::new(RedactProcessor::new(RedactParameters::from(parameters))),
            Box::new(CryptoHashProcessor::new(parameters.crypto_hash_key.clone())),
            Box::new(EncryptProcessor::new(parameters.encrypt_key.as_ref())),
            Box::new(SubstituteProcessor::new()),
            Box::new(PerturbProcessor::new()),
            Box::new(KeepProcessor::new()),
            Box::new(GeneralizeProcessor::new()),
        ];

        let processors: HashMap<MethodId, Box<dyn Processor>> =
            processors.into_iter().map(|p| (p.method(), p)).collect();
        debug_assert_eq!(processors.len(), MethodId::ALL.len());

        tracing::debug!(
            processors = processors.len(),
            scope = %context.scope(),
            "Processor registry built"
        );

        Ok(Self { processors })
    }

    /// Processor for a method
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the method is not registered
    pub fn get(&self, method: MethodId) -> Result<&dyn Processor> {
        self.processors
            .get(&method)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                CloakError::Configuration(format!("No processor registered for method {method}"))
            })
    }

    /// Registered methods, sorted
    pub fn methods(&self) -> Vec<MethodId> {
        let mut methods: Vec<MethodId> = self.processors.keys().copied().collect();
        methods.sort();
        methods
    }

    /// Number of registered processors
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

fn check_not_blank(name: &str, key: Option<&SecretKey>) -> Result<()> {
    match key {
        Some(key) if key.expose_secret().is_blank() => Err(CloakError::Configuration(format!(
            "parameters.{name} is set but empty"
        ))),
        _ => Ok(()),
    }
}

//! Anonymization module for Cloak
//!
//! This module turns an ordered list of rules into transformations of FHIR
//! records. Each rule pairs a path selector with one of eight methods.
//!
//! # Architecture
//!
//! The anonymization pipeline consists of:
//! - **Rules**: selectors and methods resolved from configuration ([`rules`], [`selector`])
//! - **Context**: construction-time key prefix for date shifting ([`context`])
//! - **Processors**: one implementation per method ([`processors`], [`registry`])
//! - **Engine**: rule dispatch, precedence and error policy ([`engine`])
//! - **Validation**: optional structural checks around each call ([`validation`])
//!
//! # Usage
//!
//! ```rust,no_run
//! use cloak::anonymization::{AnonymizationSettings, AnonymizerEngine, EngineContext};
//!
//! # fn example() -> cloak::domain::Result<()> {
//! let engine = AnonymizerEngine::from_file("cloak.toml", &EngineContext::for_file("patients.json"))?;
//! let output = engine.anonymize_json(
//!     r#"{"resourceType":"Patient","birthDate":"1974-12-25"}"#,
//!     &AnonymizationSettings::validated(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod processors;
pub mod registry;
pub mod rules;
pub mod selector;
pub mod settings;
pub mod validation;

// Re-export main types
pub use context::{resolve_prefix, EngineContext, ResolvedContext};
pub use engine::{AnonymizerEngine, AnonymizerEngineBuilder};
pub use processors::{PreparedOptions, ProcessContext, Processor};
pub use registry::ProcessorRegistry;
pub use rules::{AnonymizationRule, MethodId, RuleOptions, RuleSet};
pub use selector::PathSelector;
pub use settings::AnonymizationSettings;
pub use validation::{RecordValidator, StructuralValidator};

// Cloak - Rule-driven anonymization for FHIR clinical records
// Copyright (c) 2025 Cloak Contributors
// Licensed under the MIT License

//! # Cloak - FHIR anonymization
//!
//! Cloak applies an ordered list of anonymization rules to FHIR JSON
//! resources: each rule selects elements by path and transforms them with one
//! of eight methods (date shifting, redaction, keyed hashing, encryption,
//! substitution, perturbation, generalization, or keep).
//!
//! ## Architecture
//!
//! Cloak follows a layered architecture:
//!
//! - [`anonymization`] - Rules, processors and the anonymizer engine
//! - [`domain`] - Resources, the element tree and error types
//! - [`adapters`] - FHIR JSON and NDJSON parsing and serialization
//! - [`config`] - Configuration files, environment overrides and keys
//! - [`core`] - Folder and bulk runs over many files
//! - [`cli`] - Command-line interface and argument parsing
//! - [`logging`] - Structured logging and per-engine dispatchers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cloak::anonymization::{AnonymizationSettings, AnonymizerEngine, EngineContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AnonymizerEngine::from_file("cloak.toml", &EngineContext::none())?;
//!
//!     let input = r#"{"resourceType":"Patient","id":"p1","birthDate":"1974-12-25"}"#;
//!     match engine.anonymize_json(input, &AnonymizationSettings::default())? {
//!         Some(output) => println!("{output}"),
//!         None => println!("record dropped"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Rule Precedence
//!
//! Rules run in the order they are declared. The first rule that matches an
//! element owns it: a later, broader rule never undoes an earlier decision.
//!
//! ```toml
//! [[rules]]
//! path = "Patient.name.family"
//! method = "keep"
//!
//! [[rules]]
//! path = "Patient.name"
//! method = "redact"     # removes everything in name except family
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`domain::CloakError`] with an [`domain::ErrorKind`]:
//! configuration errors and validation errors always reach the caller, while
//! processing errors follow the configured policy (`throw` or `skip`).
//!
//! ```rust,no_run
//! use cloak::anonymization::AnonymizerEngine;
//! use cloak::config::AnonymizerConfig;
//! use cloak::domain::CloakError;
//!
//! fn build(config: AnonymizerConfig) -> Result<AnonymizerEngine, CloakError> {
//!     AnonymizerEngine::new(config)
//! }
//! ```
//!
//! ## Logging
//!
//! Cloak uses structured logging with the `tracing` crate. Log events carry
//! resource types, locations and counts, never element values.

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

//! Format adapters for Cloak.
//!
//! - [`fhir_json`] - FHIR JSON and NDJSON parsing and serialization
//!
//! Adapters isolate the wire format from the engine, which only sees
//! [`Resource`](crate::domain::Resource) values and element trees.

pub mod fhir_json;

//! Redaction processor
//!
//! Redacted elements are removed from the output. With partial redaction
//! enabled, dates keep their year and postal codes keep their first three
//! digits, following the HIPAA Safe Harbor allowances.
//!
//! A value only counts as a date when it has at least month precision, or
//! when a bare year sits in a date-named field. `postalCode`, `id` and
//! `value` fields never count.

use super::date_shift::{parse_fhir_date, FhirDate};
use super::{PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::MethodId;
use crate::config::ParameterConfig;
use crate::domain::{ElementNode, Result};
use serde_json::Value;

const POSTAL_CODE_FIELD: &str = "postalCode";
const DISCLOSED_ZIP_DIGITS: usize = 3;

/// Fields whose text can look like a date without being one
const NON_DATE_FIELDS: [&str; 3] = [POSTAL_CODE_FIELD, "value", "id"];

fn is_date_field(name: &str) -> bool {
    matches!(name, "date" | "start" | "end" | "instant" | "issued")
        || name.ends_with("Date")
        || name.ends_with("DateTime")
        || name.ends_with("Instant")
}

/// Year of a date worth keeping, if the leaf holds one
fn disclosed_year(name: &str, text: &str) -> Option<String> {
    if NON_DATE_FIELDS.contains(&name) {
        return None;
    }
    let date = parse_fhir_date(text)?;
    let is_date = match date {
        FhirDate::Year(_) => is_date_field(name),
        FhirDate::YearMonth(..) | FhirDate::Date(_) | FhirDate::DateTime(_) => true,
    };
    (is_date && !date.implies_protected_age()).then(|| format!("{:04}", date.year()))
}

/// Partial-redaction switches
#[derive(Debug, Clone, Default)]
pub struct RedactParameters {
    /// Keep the year of dates
    pub enable_partial_dates: bool,
    /// Keep the first three digits of postal codes
    pub enable_partial_zip_codes: bool,
    /// Three-digit areas that are masked entirely
    pub restricted_zip_areas: Vec<String>,
}

impl From<&ParameterConfig> for RedactParameters {
    fn from(parameters: &ParameterConfig) -> Self {
        Self {
            enable_partial_dates: parameters.enable_partial_dates_for_redact,
            enable_partial_zip_codes: parameters.enable_partial_zip_codes_for_redact,
            restricted_zip_areas: parameters.restricted_zip_code_tabulation_areas.clone(),
        }
    }
}

/// Redaction processor
pub struct RedactProcessor {
    parameters: RedactParameters,
}

impl RedactProcessor {
    /// Create a new redaction processor
    pub fn new(parameters: RedactParameters) -> Self {
        Self { parameters }
    }

    fn is_partial(&self) -> bool {
        self.parameters.enable_partial_dates || self.parameters.enable_partial_zip_codes
    }

    fn redact_primitive(&self, leaf: &mut ElementNode) {
        let partial = match leaf.value_str() {
            Some(text) if self.parameters.enable_partial_zip_codes && leaf.name() == POSTAL_CODE_FIELD => {
                self.partial_postal_code(text)
            }
            Some(text) if self.parameters.enable_partial_dates => disclosed_year(leaf.name(), text),
            _ => None,
        };

        match partial {
            Some(kept) => leaf.set_value(Value::String(kept)),
            None => leaf.clear(),
        }
    }

    fn partial_postal_code(&self, postal_code: &str) -> Option<String> {
        let area: String = postal_code.chars().take(DISCLOSED_ZIP_DIGITS).collect();
        if area.chars().count() < DISCLOSED_ZIP_DIGITS || !area.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let restricted = self.parameters.restricted_zip_areas.contains(&area);
        let masked = postal_code
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if c.is_ascii_digit() && (restricted || i >= DISCLOSED_ZIP_DIGITS) {
                    '0'
                } else {
                    c
                }
            })
            .collect();
        Some(masked)
    }
}

impl Processor for RedactProcessor {
    fn method(&self) -> MethodId {
        MethodId::Redact
    }

    fn process(
        &self,
        node: &mut ElementNode,
        _context: &ProcessContext<'_>,
        _options: &PreparedOptions,
    ) -> Result<()> {
        if !self.is_partial() {
            node.clear();
            return Ok(());
        }
        node.try_for_each_primitive_mut(&mut |leaf| {
            self.redact_primitive(leaf);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ProcessContext<'static> {
        ProcessContext {
            resource_type: "Patient",
            resource_id: Some("p1"),
            location: "Patient.address[0]",
        }
    }

    fn redact(parameters: RedactParameters, value: serde_json::Value) -> Option<serde_json::Value> {
        let mut node = ElementNode::from_json("address", &value);
        RedactProcessor::new(parameters)
            .process(&mut node, &context(), &PreparedOptions::None)
            .unwrap();
        node.to_json()
    }

    #[test]
    fn test_full_redaction_removes_node() {
        let out = redact(
            RedactParameters::default(),
            json!({"city": "Boston", "postalCode": "02118"}),
        );
        assert_eq!(out, None);
    }

    #[test]
    fn test_partial_zip_code() {
        let parameters = RedactParameters {
            enable_partial_zip_codes: true,
            ..Default::default()
        };
        let out = redact(parameters, json!({"city": "Boston", "postalCode": "02118-1234"}));
        assert_eq!(out, Some(json!({"postalCode": "02100-0000"})));
    }

    #[test]
    fn test_restricted_zip_area() {
        let parameters = RedactParameters {
            enable_partial_zip_codes: true,
            restricted_zip_areas: vec!["036".to_string()],
            ..Default::default()
        };
        let out = redact(parameters, json!({"postalCode": "03601"}));
        assert_eq!(out, Some(json!({"postalCode": "00000"})));
    }

    #[test]
    fn test_partial_dates_keep_year() {
        let parameters = RedactParameters {
            enable_partial_dates: true,
            ..Default::default()
        };
        let mut node = ElementNode::primitive("birthDate", json!("1980-05-01"));
        RedactProcessor::new(parameters.clone())
            .process(&mut node, &context(), &PreparedOptions::None)
            .unwrap();
        assert_eq!(node.value(), Some(&json!("1980")));

        let mut very_old = ElementNode::primitive("birthDate", json!("1900-01-01"));
        RedactProcessor::new(parameters)
            .process(&mut very_old, &context(), &PreparedOptions::None)
            .unwrap();
        assert!(very_old.is_empty());
    }

    #[test]
    fn test_partial_mode_still_redacts_non_dates() {
        let parameters = RedactParameters {
            enable_partial_dates: true,
            ..Default::default()
        };
        let mut node = ElementNode::primitive("family", json!("Chalmers"));
        RedactProcessor::new(parameters)
            .process(&mut node, &context(), &PreparedOptions::None)
            .unwrap();
        assert!(node.is_empty());
    }

    #[test]
    fn test_partial_dates_ignore_year_like_codes() {
        let parameters = RedactParameters {
            enable_partial_dates: true,
            ..Default::default()
        };
        let processor = RedactProcessor::new(parameters);

        let mut identifier =
            ElementNode::from_json("identifier", &json!({"system": "urn:mrn", "value": "2001"}));
        processor
            .process(&mut identifier, &context(), &PreparedOptions::None)
            .unwrap();
        assert_eq!(identifier.to_json(), None);

        let mut address = ElementNode::from_json(
            "address",
            &json!({"city": "X", "postalCode": "1985", "period": {"start": "2010-04"}}),
        );
        processor
            .process(&mut address, &context(), &PreparedOptions::None)
            .unwrap();
        assert_eq!(address.to_json(), Some(json!({"period": {"start": "2010"}})));

        let mut dated_value = ElementNode::primitive("value", json!("2001-05-01"));
        processor
            .process(&mut dated_value, &context(), &PreparedOptions::None)
            .unwrap();
        assert!(dated_value.is_empty());
    }

    #[test]
    fn test_partial_dates_keep_bare_year_in_date_field() {
        let parameters = RedactParameters {
            enable_partial_dates: true,
            ..Default::default()
        };
        let processor = RedactProcessor::new(parameters);

        let mut birth_date = ElementNode::primitive("birthDate", json!("1980"));
        processor
            .process(&mut birth_date, &context(), &PreparedOptions::None)
            .unwrap();
        assert_eq!(birth_date.value(), Some(&json!("1980")));

        let mut code = ElementNode::primitive("code", json!("1980"));
        processor
            .process(&mut code, &context(), &PreparedOptions::None)
            .unwrap();
        assert!(code.is_empty());
    }
}

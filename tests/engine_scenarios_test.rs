//! End-to-end tests for the anonymizer engine facade

use cloak::adapters::fhir_json;
use cloak::anonymization::{AnonymizationSettings, AnonymizerEngine};
use cloak::config::{secret_key, AnonymizerConfig, ProcessingErrorPolicy, RuleConfig};
use cloak::domain::{ElementNode, ErrorKind, Resource};
use serde_json::{json, Value};

const PATIENT: &str = r#"{
  "resourceType": "Patient",
  "id": "example",
  "gender": "female",
  "birthDate": "1980-05-01",
  "name": [{"use": "official", "family": "Chalmers", "given": ["Peter", "James"]}],
  "address": [{"city": "PleasantVille", "postalCode": "3999"}]
}"#;

fn engine(rules: Vec<RuleConfig>) -> AnonymizerEngine {
    AnonymizerEngine::new(AnonymizerConfig {
        rules,
        ..Default::default()
    })
    .unwrap()
}

fn patient() -> Value {
    serde_json::from_str(PATIENT).unwrap()
}

fn anonymize(engine: &AnonymizerEngine, input: &Value) -> Option<Value> {
    let resource = Resource::from_value(input.clone()).unwrap();
    engine
        .anonymize_resource(&resource, &AnonymizationSettings::default())
        .unwrap()
        .map(Resource::into_value)
}

#[test]
fn test_redact_birth_date_leaves_other_fields() {
    let engine = engine(vec![RuleConfig::new("Patient.birthDate", "Redact")]);

    let output = anonymize(&engine, &patient()).unwrap();

    let mut expected = patient();
    expected.as_object_mut().unwrap().remove("birthDate");
    assert_eq!(output, expected);
}

#[test]
fn test_skip_policy_drops_failing_record_only() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.gender", "perturb").with_option("span", json!(1))],
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(anonymize(&engine, &patient()), None);

    let unrelated = json!({"resourceType": "Patient", "id": "other", "active": true});
    assert_eq!(anonymize(&engine, &unrelated), Some(unrelated));
}

#[test]
fn test_throw_policy_propagates_processing_error() {
    let engine = engine(vec![
        RuleConfig::new("Patient.gender", "perturb").with_option("span", json!(1))
    ]);
    let resource = Resource::from_value(patient()).unwrap();

    let err = engine
        .anonymize_resource(&resource, &AnonymizationSettings::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Processing);
    assert!(err.to_string().contains("Patient.gender"));
}

#[test]
fn test_unmatched_record_round_trips_through_text() {
    let engine = engine(vec![RuleConfig::new("Observation.subject", "redact")]);

    let output = engine
        .anonymize_json(PATIENT, &AnonymizationSettings::default())
        .unwrap()
        .unwrap();

    let direct = fhir_json::serialize(&fhir_json::parse(PATIENT).unwrap(), false).unwrap();
    assert_eq!(output, direct);
}

#[test]
fn test_unknown_method_fails_construction() {
    let err = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.name", "scramble")],
        ..Default::default()
    })
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("scramble"));
}

#[test]
fn test_validation_error_bypasses_skip_policy() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.name", "redact")],
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    })
    .unwrap();
    let invalid = Resource::from_value(json!({"resourceType": "Patient", "gender": ""})).unwrap();

    let err = engine
        .anonymize_resource(&invalid, &AnonymizationSettings::validated())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_malformed_text_is_reported_under_skip_policy() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    })
    .unwrap();

    assert!(engine
        .anonymize_json("{not json", &AnonymizationSettings::default())
        .is_err());
}

#[test]
fn test_first_matching_rule_wins() {
    let engine = engine(vec![
        RuleConfig::new("Patient.name.family", "keep"),
        RuleConfig::new("Patient.name", "redact"),
        RuleConfig::new("Patient.address.postalCode", "substitute")
            .with_option("replaceWith", json!("00000")),
        RuleConfig::new("Patient.address", "redact"),
    ]);

    let output = anonymize(&engine, &patient()).unwrap();

    assert_eq!(output["name"], json!([{"family": "Chalmers"}]));
    assert_eq!(output["address"], json!([{"postalCode": "00000"}]));
    assert_eq!(output["gender"], "female");
}

#[test]
fn test_crypto_hash_is_stable_across_engines() {
    let config = AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.id", "cryptoHash")],
        parameters: cloak::config::ParameterConfig {
            crypto_hash_key: Some(secret_key("hash-key".to_string())),
            ..Default::default()
        },
        ..Default::default()
    };
    let first = anonymize(&AnonymizerEngine::new(config.clone()).unwrap(), &patient()).unwrap();
    let second = anonymize(&AnonymizerEngine::new(config).unwrap(), &patient()).unwrap();

    let id = first["id"].as_str().unwrap();
    assert_eq!(id.len(), 64);
    assert_ne!(id, "example");
    assert_eq!(first, second);
}

#[test]
fn test_generalize_age_into_bands() {
    let engine = engine(vec![RuleConfig::new("Observation.valueInteger", "generalize")
        .with_option(
            "cases",
            json!([
                {"range": [0, 18], "value": "child"},
                {"range": [18, null], "value": "adult"}
            ]),
        )]);
    let observation = json!({"resourceType": "Observation", "status": "final", "valueInteger": 42});

    let output = anonymize(&engine, &observation).unwrap();

    assert_eq!(output["valueInteger"], "adult");
    assert_eq!(output["status"], "final");
}

#[test]
fn test_element_facade_validates_resource_roots() {
    let engine = engine(vec![RuleConfig::new("Patient.name.given", "redact")]);
    let tree = ElementNode::from_resource(&Resource::from_value(patient()).unwrap());

    let output = engine
        .anonymize_element(&tree, &AnonymizationSettings::validated())
        .unwrap()
        .unwrap();

    let json = output.to_json().unwrap();
    assert_eq!(json["name"], json!([{"use": "official", "family": "Chalmers"}]));
    assert_eq!(json["birthDate"], "1980-05-01");
}

#[test]
fn test_output_validation_error_bypasses_skip_policy() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.id", "encrypt")],
        parameters: cloak::config::ParameterConfig {
            encrypt_key: Some(secret_key("encrypt-key".to_string())),
            ..Default::default()
        },
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    })
    .unwrap();
    let resource = Resource::from_value(patient()).unwrap();

    // Ciphertext is base64 with padding, which a resource id cannot hold
    let err = engine
        .anonymize_resource(
            &resource,
            &AnonymizationSettings::default().with_validate_output(true),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("id"));
}

#[test]
fn test_dropped_record_skips_output_validation() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![
            RuleConfig::new("Patient.name", "substitute").with_option("replaceWith", json!({"text": ""})),
            RuleConfig::new("Patient.gender", "perturb").with_option("span", json!(1)),
        ],
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    })
    .unwrap();
    let resource = Resource::from_value(patient()).unwrap();

    let output = engine
        .anonymize_resource(&resource, &AnonymizationSettings::validated())
        .unwrap();

    assert!(output.is_none());
}

#[test]
fn test_partial_redaction_does_not_disclose_year_like_codes() {
    let engine = AnonymizerEngine::new(AnonymizerConfig {
        rules: vec![
            RuleConfig::new("Patient.identifier", "redact"),
            RuleConfig::new("Patient.address", "redact"),
            RuleConfig::new("Patient.birthDate", "redact"),
        ],
        parameters: cloak::config::ParameterConfig {
            enable_partial_dates_for_redact: true,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    let input = json!({
        "resourceType": "Patient",
        "identifier": [{"system": "urn:mrn", "value": "2001"}],
        "address": [{"city": "X", "postalCode": "1985"}],
        "birthDate": "1980-05-01"
    });

    let output = anonymize(&engine, &input).unwrap();

    assert_eq!(output, json!({"resourceType": "Patient", "birthDate": "1980"}));
}

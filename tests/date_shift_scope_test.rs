//! Date-shift offsets across file, folder and resource scopes

use chrono::NaiveDate;
use cloak::anonymization::processors::{DateShiftParameters, DateShiftProcessor};
use cloak::anonymization::{
    resolve_prefix, AnonymizationSettings, AnonymizerEngine, EngineContext, ProcessContext,
};
use cloak::config::{secret_key, AnonymizerConfig, DateShiftScope, ParameterConfig, RuleConfig};
use cloak::domain::{ErrorKind, Resource};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

const KEY: &str = "date-shift-test-key";

fn config(scope: DateShiftScope) -> AnonymizerConfig {
    AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.birthDate", "dateShift")],
        parameters: ParameterConfig {
            date_shift_key: Some(secret_key(KEY.to_string())),
            date_shift_scope: scope,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn shifted_birth_date(engine: &AnonymizerEngine, id: &str) -> NaiveDate {
    let resource = Resource::from_value(
        json!({"resourceType": "Patient", "id": id, "birthDate": "1980-05-01"}),
    )
    .unwrap();
    let output = engine
        .anonymize_resource(&resource, &AnonymizationSettings::default())
        .unwrap()
        .unwrap();
    NaiveDate::parse_from_str(output.get("birthDate").unwrap().as_str().unwrap(), "%Y-%m-%d")
        .unwrap()
}

fn file_engine(path: &str) -> AnonymizerEngine {
    AnonymizerEngine::builder(config(DateShiftScope::File))
        .context(EngineContext::for_file(path))
        .build()
        .unwrap()
}

fn offset_for_prefix(prefix: &str) -> i64 {
    let parameters = config(DateShiftScope::File).parameters;
    let resolved = EngineContext::for_file(prefix)
        .resolve(DateShiftScope::File)
        .unwrap();
    DateShiftProcessor::new(DateShiftParameters::new(&parameters, &resolved))
        .offset_days(resolved.key_prefix())
        .unwrap()
}

#[test]
fn test_file_scope_depends_only_on_base_name() {
    let a = shifted_birth_date(&file_engine("input/2024/a.json"), "p1");
    let same_name = shifted_birth_date(&file_engine("elsewhere/a.json"), "p2");
    assert_eq!(a, same_name);

    let original = NaiveDate::from_ymd_opt(1980, 5, 1).unwrap();
    assert_eq!((a - original).num_days(), offset_for_prefix("a.json"));
}

#[test]
fn test_file_scope_differs_between_files() {
    let offsets: HashSet<i64> = ["a.json", "b.json", "c.json", "d.json", "e.json", "f.json"]
        .into_iter()
        .map(offset_for_prefix)
        .collect();
    assert!(offsets.len() > 1);
    assert!(offsets.iter().all(|offset| offset.abs() <= 50));
}

#[test]
fn test_folder_scope_shares_offset_between_resources() {
    let engine = AnonymizerEngine::builder(config(DateShiftScope::Folder))
        .context(EngineContext::for_folder("data/site-17/"))
        .build()
        .unwrap();

    assert_eq!(shifted_birth_date(&engine, "p1"), shifted_birth_date(&engine, "p2"));
}

#[test]
fn test_resource_scope_keys_by_resource() {
    let engine = AnonymizerEngine::new(config(DateShiftScope::Resource)).unwrap();

    assert_eq!(shifted_birth_date(&engine, "p1"), shifted_birth_date(&engine, "p1"));

    let dates: HashSet<NaiveDate> = (0..8)
        .map(|i| shifted_birth_date(&engine, &format!("patient-{i}")))
        .collect();
    assert!(dates.len() > 1);
}

#[test]
fn test_file_scope_without_file_name_is_rejected() {
    let err = AnonymizerEngine::builder(config(DateShiftScope::File))
        .context(EngineContext::none())
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_resolve_prefix_per_scope() {
    let file = Path::new("in/records/a.json");
    let folder = Path::new("in/records/");

    assert_eq!(resolve_prefix(DateShiftScope::Resource, None, None).unwrap(), "");
    assert_eq!(
        resolve_prefix(DateShiftScope::File, Some(file), Some(folder)).unwrap(),
        "a.json"
    );
    assert_eq!(
        resolve_prefix(DateShiftScope::Folder, Some(file), Some(folder)).unwrap(),
        "records"
    );
}

#[test]
fn test_effective_prefix_for_resource_scope() {
    let parameters = config(DateShiftScope::Resource).parameters;
    let resolved = EngineContext::none()
        .resolve(DateShiftScope::Resource)
        .unwrap();
    let processor = DateShiftProcessor::new(DateShiftParameters::new(&parameters, &resolved));
    let context = ProcessContext {
        resource_type: "Patient",
        resource_id: Some("p1"),
        location: "Patient.birthDate",
    };

    assert_eq!(processor.effective_key_prefix(&context), "Patient/p1");
}

//! Folder anonymization tests

use cloak::config::{
    secret_key, AnonymizerConfig, DateShiftScope, ParameterConfig, ProcessingErrorPolicy,
    RuleConfig,
};
use cloak::core::batch::{BatchOptions, FolderAnonymizer};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config() -> AnonymizerConfig {
    AnonymizerConfig {
        rules: vec![
            RuleConfig::new("Patient.name", "redact"),
            RuleConfig::new("Patient.birthDate", "dateShift"),
        ],
        parameters: ParameterConfig {
            date_shift_key: Some(secret_key("batch-key".to_string())),
            date_shift_scope: DateShiftScope::Folder,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn patient(id: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{"family": "Chalmers"}],
        "birthDate": "1974-12-25"
    })
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_folder_of_json_files() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_json(&input.path().join("a.json"), &patient("a"));
    write_json(&input.path().join("b.json"), &patient("b"));
    fs::write(input.path().join("README.txt"), "not a resource").unwrap();

    let summary = FolderAnonymizer::new(config(), BatchOptions::new(input.path(), output.path()))
        .run()
        .await
        .unwrap();

    assert!(summary.is_successful());
    assert_eq!(summary.files_total, 2);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.records_anonymized, 2);

    let a = read_json(&output.path().join("a.json"));
    let b = read_json(&output.path().join("b.json"));
    assert!(a.get("name").is_none());
    assert_eq!(a["id"], "a");
    // One folder, one offset
    assert_eq!(a["birthDate"], b["birthDate"]);
    assert!(!output.path().join("README.txt").exists());
}

#[tokio::test]
async fn test_recursive_run_mirrors_layout() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_json(&input.path().join("top.json"), &patient("top"));
    write_json(&input.path().join("site-a").join("nested.json"), &patient("nested"));

    let mut options = BatchOptions::new(input.path(), output.path());
    options.recursive = true;
    let summary = FolderAnonymizer::new(config(), options).run().await.unwrap();

    assert_eq!(summary.files_processed, 2);
    assert!(output.path().join("site-a").join("nested.json").exists());
}

#[tokio::test]
async fn test_bulk_ndjson_with_skip_policy() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let lines = [
        json!({"resourceType": "Observation", "status": "final", "valueQuantity": {"value": 72.5, "unit": "kg"}}),
        json!({"resourceType": "Observation", "status": "final", "valueQuantity": {"unit": "kg"}}),
        json!({"resourceType": "Observation", "status": "amended", "valueQuantity": {"value": 80, "unit": "kg"}}),
    ];
    let text: String = lines
        .iter()
        .map(|line| format!("{}\n", serde_json::to_string(line).unwrap()))
        .collect();
    fs::write(input.path().join("obs.ndjson"), text).unwrap();

    let config = AnonymizerConfig {
        rules: vec![RuleConfig::new("Observation.valueQuantity", "perturb")
            .with_option("span", json!(0))],
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    };
    let mut options = BatchOptions::new(input.path(), output.path());
    options.bulk = true;

    let summary = FolderAnonymizer::new(config, options).run().await.unwrap();

    assert!(summary.is_successful());
    assert_eq!(summary.records_total, 3);
    assert_eq!(summary.records_anonymized, 2);
    assert_eq!(summary.records_dropped, 1);

    let written = fs::read_to_string(output.path().join("obs.ndjson")).unwrap();
    let records: Vec<Value> = written
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["valueQuantity"]["value"], 72.5);
    assert_eq!(records[1]["status"], "amended");
}

#[tokio::test]
async fn test_skip_existing_outputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_json(&input.path().join("a.json"), &patient("a"));
    write_json(&input.path().join("b.json"), &patient("b"));
    fs::write(output.path().join("a.json"), "untouched").unwrap();

    let mut options = BatchOptions::new(input.path(), output.path());
    options.skip_existing = true;
    let summary = FolderAnonymizer::new(config(), options).run().await.unwrap();

    assert_eq!(summary.files_skipped_existing, 1);
    assert_eq!(summary.files_processed, 1);
    assert_eq!(
        fs::read_to_string(output.path().join("a.json")).unwrap(),
        "untouched"
    );
}

#[tokio::test]
async fn test_bad_file_is_reported_and_others_succeed() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_json(&input.path().join("good.json"), &patient("good"));
    fs::write(input.path().join("broken.json"), "{\"resourceType\": ").unwrap();

    let summary = FolderAnonymizer::new(config(), BatchOptions::new(input.path(), output.path()))
        .run()
        .await
        .unwrap();

    assert!(!summary.is_successful());
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_processed, 1);
    assert!(summary.errors[0].file.ends_with("broken.json"));
    assert!(output.path().join("good.json").exists());
    assert!(!output.path().join("broken.json").exists());
}

#[tokio::test]
async fn test_missing_key_fails_the_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_json(&input.path().join("a.json"), &patient("a"));

    let mut config = config();
    config.parameters.date_shift_key = None;

    let result = FolderAnonymizer::new(config, BatchOptions::new(input.path(), output.path()))
        .run()
        .await;

    assert!(result.is_err());
}

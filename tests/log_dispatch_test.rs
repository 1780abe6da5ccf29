//! Engine-scoped log dispatch

use cloak::anonymization::{AnonymizationSettings, AnonymizerEngine};
use cloak::config::{AnonymizerConfig, LoggingConfig, ProcessingErrorPolicy, RuleConfig};
use cloak::logging::build_dispatch;
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Collects event messages in memory
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.0.lock().unwrap().push(message);
    }
}

fn skipping_config() -> AnonymizerConfig {
    AnonymizerConfig {
        rules: vec![RuleConfig::new("Patient.gender", "perturb").with_option("span", json!(1))],
        processing_error: ProcessingErrorPolicy::Skip,
        ..Default::default()
    }
}

const FAILING_PATIENT: &str = r#"{"resourceType":"Patient","id":"p1","gender":"male"}"#;

#[test]
fn test_skip_event_reaches_engine_dispatch_only() {
    let global = Captured::default();
    let _ = tracing::dispatcher::set_global_default(global.dispatch());

    let scoped = Captured::default();
    let engine = AnonymizerEngine::builder(skipping_config())
        .log_dispatch(scoped.dispatch())
        .build()
        .unwrap();

    let ambient = Captured::default();
    let output = tracing::dispatcher::with_default(&ambient.dispatch(), || {
        engine.anonymize_json(FAILING_PATIENT, &AnonymizationSettings::default())
    })
    .unwrap();

    assert_eq!(output, None);
    assert!(scoped.saw("Anonymizer engine ready"));
    assert!(scoped.saw("Record skipped"), "engine dispatch saw {:?}", scoped.messages());
    assert!(!ambient.saw("Record skipped"));
    assert!(!global.saw("Record skipped"));
}

#[test]
fn test_engine_accepts_built_dispatch() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_dir.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    let (dispatch, guard) = build_dispatch("warn", &config).unwrap();

    let engine = AnonymizerEngine::builder(skipping_config())
        .log_dispatch(dispatch)
        .build()
        .unwrap();
    let output = engine
        .anonymize_json(FAILING_PATIENT, &AnonymizationSettings::default())
        .unwrap();
    assert_eq!(output, None);

    drop(engine);
    drop(guard);

    let logged: String = std::fs::read_dir(&log_dir)
        .unwrap()
        .filter_map(|entry| std::fs::read_to_string(entry.unwrap().path()).ok())
        .collect();
    assert!(logged.contains("Record skipped"), "log file held {logged:?}");
}

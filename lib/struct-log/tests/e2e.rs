use std::sync::Mutex;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing::{Level, error, info, span};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;

use struct_log::{JsonLogLayer, StorageLayer};

use crate::mock_writer::MakeMockWriter;


/// Tests share one buffer and take `SERIAL` while they use it.
static BUFFER: Mutex<Vec<u8>> = Mutex::new(Vec::new());
static SERIAL: Mutex<()> = Mutex::new(());

fn run_and_get_raw_output<F: Fn()>(action: F) -> String {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());

    let formatting_layer = JsonLogLayer::with_hostname(
        "vault_approle".into(),
        "e2e".to_string(),
        "runner-1".to_string(),
        MakeMockWriter(&BUFFER),
    );
    let subscriber = Registry::default().with(StorageLayer).with(formatting_layer);
    tracing::subscriber::with_default(subscriber, action);

    let mut buffer = BUFFER.lock().unwrap();
    let output = buffer.to_vec();
    buffer.clear();
    String::from_utf8(output).unwrap()
}

fn run_and_get_output<F: Fn()>(action: F) -> Vec<Value> {
    run_and_get_raw_output(action)
        .lines()
        .filter(|&l| !l.is_empty())
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .collect()
}

fn test_action() {
    info!("foo");
    error!(mount_point = "approle", "bar");
}

fn spanned_action() {
    let span = span!(Level::INFO, "reconcile", resource = "approle", role = "ci");
    let _guard = span.enter();
    info!(role = "override", "inside span");
}

#[test]
fn each_line_is_valid_json() {
    let tracing_output = run_and_get_raw_output(test_action);

    let lines: Vec<&str> = tracing_output.lines().filter(|&l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(serde_json::from_str::<Value>(line).is_ok());
    }
}

#[test]
fn each_line_has_the_base_fields() {
    let tracing_output = run_and_get_output(test_action);

    for record in tracing_output {
        for field in [
            "runtime",
            "level",
            "date",
            "message",
            "file",
            "lineno",
            "logger",
            "hostname",
            "version",
            "application",
        ] {
            assert!(record.get(field).is_some(), "missing {field} in {record}");
        }
        assert_eq!(record["hostname"], "runner-1");
        assert_eq!(record["application"], "vault_approle");
    }
}

#[test]
fn event_fields_are_included() {
    let tracing_output = run_and_get_output(test_action);

    assert_eq!(tracing_output[0]["message"], "foo");
    assert_eq!(tracing_output[0]["level"], "info");
    assert_eq!(tracing_output[1]["message"], "bar");
    assert_eq!(tracing_output[1]["level"], "error");
    assert_eq!(tracing_output[1]["mount_point"], "approle");
}

#[test]
fn span_fields_are_included_and_event_fields_win() {
    let tracing_output = run_and_get_output(spanned_action);

    assert_eq!(tracing_output.len(), 1);
    let record = &tracing_output[0];
    assert_eq!(record["resource"], "approle");
    assert_eq!(record["role"], "override");
}

#[test]
fn time_is_formatted_according_to_rfc_3339() {
    let tracing_output = run_and_get_output(test_action);

    for record in tracing_output {
        let time = record.get("date").unwrap().as_str().unwrap();
        let parsed = time::OffsetDateTime::parse(time, &Rfc3339).unwrap();
        assert!(parsed.offset().is_utc());
    }
}

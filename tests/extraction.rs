//! Extraction Integration Tests
//!
//! Raw model text -> extract -> validate, the way the orchestrator chains
//! them for every attempt.

use regdraft::core::{extract, SchemaValidator};
use regdraft::domain::JobKind;

const INCIDENT_BODY: &str = r#"{"summary":"Heap overflow in the YAML parser allows remote code execution.","severity":"high","affected_versions":["1.0.0"],"impact":"Attackers can execute code by submitting crafted configuration files.","mitigations":["Upgrade to 1.0.1"],"timeline":[{"date":"2024-05-01","event":"Report received"}]}"#;

#[test]
fn test_fenced_incident_is_extracted_verbatim_and_valid() {
    let raw = format!("```json\n{}\n```", INCIDENT_BODY);

    let extracted = extract(&raw);
    assert_eq!(extracted, INCIDENT_BODY);

    let outcome = SchemaValidator::new().validate(&extracted, JobKind::IncidentDraft);
    assert!(outcome.valid, "unexpected errors: {}", outcome.errors);
}

#[test]
fn test_fenced_and_bare_yield_identical_text() {
    let bodies = [
        INCIDENT_BODY,
        r#"{"a": {"b": [1, 2, {"c": "}"}]}}"#,
        r#"[{"question_id": "q1"}]"#,
        "{\n  \"pretty\": true\n}",
        r#"{"summary":"Run ```make``` to rebuild.","mitigations":["```sh\nupgrade\n```"]}"#,
    ];

    for body in bodies {
        let fenced = extract(&format!("```json\n{}\n```", body));
        let bare_fence = extract(&format!("```\n{}\n```", body));
        let bare = extract(body);

        assert_eq!(fenced, bare, "fenced vs bare for {}", body);
        assert_eq!(bare_fence, bare, "bare fence vs bare for {}", body);
    }
}

#[test]
fn test_chatty_response_still_validates() {
    let raw = format!(
        "Certainly! Here is the incident draft you asked for:\n\n{}\n\nLet me know if you need changes.",
        INCIDENT_BODY
    );

    let extracted = extract(&raw);
    assert_eq!(extracted, INCIDENT_BODY);
    assert!(SchemaValidator::new()
        .validate(&extracted, JobKind::IncidentDraft)
        .valid);
}

#[test]
fn test_not_json_fails_validation_without_panicking() {
    let extracted = extract("not json");
    assert_eq!(extracted, "not json");

    let outcome = SchemaValidator::new().validate(&extracted, JobKind::IncidentDraft);
    assert!(!outcome.valid);
    assert!(outcome.errors.starts_with("Invalid JSON"));
}

#[test]
fn test_wrong_shape_reports_schema_errors() {
    let raw = "```json\n{\"summary\": \"\", \"severity\": \"catastrophic\"}\n```";
    let outcome = SchemaValidator::new().validate(&extract(raw), JobKind::IncidentDraft);

    assert!(!outcome.valid);
    assert!(!outcome.errors.is_empty());
}

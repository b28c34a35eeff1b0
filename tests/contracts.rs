//! Contract Integration Tests
//!
//! Every fallback document must satisfy its own contract schema, whatever
//! the caller supplied as facts.

use std::sync::Arc;

use proptest::prelude::*;
use regdraft::core::{contract_for, fallback, SchemaValidator, CONTRACTS, PLACEHOLDER};
use regdraft::domain::JobKind;
use serde_json::{json, Value};

fn assert_fallback_valid(facts: &Value) {
    let validator = SchemaValidator::new();
    for kind in JobKind::ALL {
        let doc = fallback(kind, facts);
        let outcome = validator.validate(&doc, kind);
        assert!(
            outcome.valid,
            "fallback for {} invalid with facts {}: {}",
            kind, facts, outcome.errors
        );
    }
}

#[test]
fn test_fallback_valid_with_no_facts() {
    assert_fallback_valid(&Value::Null);
    assert_fallback_valid(&json!({}));
}

#[test]
fn test_fallback_valid_with_minimal_facts() {
    assert_fallback_valid(&json!({"title": "Parser overflow"}));
    assert_fallback_valid(&json!({"questions": ["Do you encrypt backups?"]}));
}

#[test]
fn test_fallback_valid_with_full_facts() {
    let facts = json!({
        "title": "Heap overflow in YAML parser",
        "summary": "A crafted document overflows a heap buffer.",
        "severity": "critical",
        "product": "Acme Gateway",
        "affected_versions": ["1.0.0", "1.0.1"],
        "impact": "Remote code execution.",
        "root_cause": "Missing bounds check.",
        "mitigations": ["Upgrade to 1.0.2", "Disable YAML import"],
        "timeline": [
            {"date": "2024-05-01", "event": "Report received from admin@corp.com"},
            {"date": "2024-05-03", "event": "Fix released"}
        ],
        "cve_ids": ["CVE-2024-12345"],
        "questions": [
            {"id": "AC-1", "text": "Do you enforce MFA for administrators?"},
            {"id": "IR-4", "question": "Do you notify customers of incidents?"}
        ]
    });
    assert_fallback_valid(&facts);
}

#[test]
fn test_fallback_valid_with_odd_facts() {
    let cases = [
        json!("just a string"),
        json!([1, 2, 3]),
        json!(42),
        json!({"severity": 5, "affected_versions": "2.0", "mitigations": "Restart"}),
        json!({"summary": "   ", "impact": "", "affected_versions": [null, {}, ""]}),
        json!({"timeline": [{"date": "2024"}, "not an object", {"event": "no date"}]}),
        json!({"cve_ids": ["cve-2024-0001", "CVE-24-1", 7]}),
        json!({"title": "x".repeat(5000), "summary": "é".repeat(3000)}),
        json!({"releases": [{"version": "3.1"}, "3.2", {"tag": "v4"}]}),
        json!({"questions": [null, {}, {"id": ""}, {"id": 17, "text": "Numeric id?"}, 99]}),
        json!({"questions": (0..300).map(|i| json!({"id": format!("Q-{}", i)})).collect::<Vec<_>>()}),
    ];

    for facts in &cases {
        assert_fallback_valid(facts);
    }
}

#[test]
fn test_fallback_placeholders_present() {
    let doc: Value = serde_json::from_str(&fallback(JobKind::IncidentDraft, &json!({}))).unwrap();
    assert_eq!(doc["summary"], PLACEHOLDER);
    assert_eq!(doc["impact"], PLACEHOLDER);
}

#[test]
fn test_every_contract_schema_compiles() {
    let validator = SchemaValidator::new();
    for contract in CONTRACTS {
        let outcome = validator.validate("{}", contract.kind);
        // "{}" misses required fields, so it must be rejected by a working schema
        assert!(!outcome.valid);
        assert!(!outcome.errors.starts_with("Schema for"));
    }
    assert_eq!(validator.cached_schemas(), CONTRACTS.len());
}

#[test]
fn test_system_prompts_carry_no_placeholder_braces() {
    for kind in JobKind::ALL {
        let contract = contract_for(kind);
        assert!(!contract.system_prompt.contains("{tenant"));
        assert!(!contract.system_prompt.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_validator_across_tasks() {
    let validator = Arc::new(SchemaValidator::new());

    let mut handles = Vec::new();
    for i in 0..16 {
        let validator = validator.clone();
        handles.push(tokio::spawn(async move {
            let facts = json!({"title": format!("Incident {}", i)});
            let doc = fallback(JobKind::IncidentDraft, &facts);
            validator.validate(&doc, JobKind::IncidentDraft)
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.valid, "{}", outcome.errors);
    }
    assert_eq!(validator.cached_schemas(), 1);
}

/// Arbitrary JSON values, a few levels deep
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "\\PC{0,80}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,12}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Facts objects whose keys are the ones the templates read
fn facts() -> impl Strategy<Value = Value> {
    let keys = prop::sample::select(vec![
        "title",
        "summary",
        "description",
        "severity",
        "affected_versions",
        "releases",
        "impact",
        "root_cause",
        "mitigations",
        "timeline",
        "cve_ids",
        "product",
        "questions",
    ]);

    prop::collection::vec((keys, json_value()), 0..10).prop_map(|pairs| {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_fallback_always_validates(facts in facts()) {
        let validator = SchemaValidator::new();
        for kind in JobKind::ALL {
            let outcome = validator.validate(&fallback(kind, &facts), kind);
            prop_assert!(outcome.valid, "{} invalid: {}", kind, outcome.errors);
        }
    }
}

//! Deterministic fallback drafts.
//!
//! When no model output survives validation the orchestrator still owes the
//! caller an artifact. The templates here build one from the caller facts
//! alone: pure, deterministic, and valid against the contract schema for any
//! input, including no facts at all. Anything that cannot be derived
//! mechanically is filled with `PLACEHOLDER` so required fields are present.
//!
//! Strings taken from the facts are redacted and clipped to the schema's
//! length bounds, so fallback artifacts carry the same guarantees as model
//! output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::domain::JobKind;

use super::redactor::redact;

/// Marker for fields an analyst must fill in
pub const PLACEHOLDER: &str = "[ANALYST INPUT REQUIRED]";

/// Notice attached to every fallback document
pub const FALLBACK_NOTICE: &str = "Generated by the deterministic fallback template because \
model output could not be validated. Every field must be reviewed before submission.";

const SEVERITIES: [&str; 5] = ["critical", "high", "medium", "low", "unknown"];

static CVE_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^CVE-[0-9]{4}-[0-9]{4,}$").ok());

/// Produce a schema-valid fallback document for `kind` as JSON text
pub fn fallback(kind: JobKind, facts: &Value) -> String {
    fallback_value(kind, facts).to_string()
}

/// Produce a schema-valid fallback document for `kind`
pub fn fallback_value(kind: JobKind, facts: &Value) -> Value {
    let empty = Map::new();
    let facts = facts.as_object().unwrap_or(&empty);

    match kind {
        JobKind::IncidentDraft => incident_draft(facts),
        JobKind::CommunicationPack => communication_pack(facts),
        JobKind::QuestionnaireAnswers => questionnaire_answers(facts),
    }
}

fn incident_draft(facts: &Map<String, Value>) -> Value {
    let mut doc = json!({
        "summary": field(facts, &["summary", "description", "title"], 2000),
        "severity": severity(facts),
        "affected_versions": or_placeholder(affected_versions(facts)),
        "impact": field(facts, &["impact"], 2000),
        "mitigations": or_placeholder(string_list(facts.get("mitigations"), 20, 500)),
        "timeline": timeline(facts),
        "draft_notice": FALLBACK_NOTICE,
    });

    if let Some(root_cause) = text(facts, &["root_cause"]) {
        doc["root_cause"] = json!(clip(&root_cause, 2000));
    }

    let cves = cve_ids(facts);
    if !cves.is_empty() {
        doc["cve_ids"] = json!(cves);
    }

    doc
}

fn communication_pack(facts: &Map<String, Value>) -> Value {
    let product = text(facts, &["product", "product_name"])
        .unwrap_or_else(|| "the affected product".to_string());
    let summary = field(facts, &["summary", "description", "title"], 1000);
    let severity = severity(facts);
    let versions = joined(&affected_versions(facts));
    let mitigations = joined(&string_list(facts.get("mitigations"), 20, 500));

    let headline = match text(facts, &["title"]) {
        Some(title) => format!("Security incident: {}", title),
        None => format!("Security incident affecting {}", product),
    };

    let customer_notice = format!(
        "We are investigating a security incident affecting {}. {} \
Affected versions: {}. Recommended action: {}.",
        product, summary, versions, mitigations
    );

    let regulator_notice = format!(
        "Notification of a security incident affecting {}. Severity assessment: {}. \
Summary: {} Affected versions: {}. Mitigations: {}. Point of contact: {}.",
        product, severity, summary, versions, mitigations, PLACEHOLDER
    );

    json!({
        "headline": clip(&headline, 200),
        "internal_summary": clip(&format!("{} (severity: {})", summary, severity), 2000),
        "customer_notice": clip(&customer_notice, 4000),
        "regulator_notice": clip(&regulator_notice, 4000),
        "faq": [
            {"question": "What happened?", "answer": clip(&summary, 1000)},
            {"question": "Which versions are affected?", "answer": clip(&versions, 1000)},
            {"question": "What should I do?", "answer": clip(&mitigations, 1000)},
        ],
        "draft_notice": FALLBACK_NOTICE,
    })
}

fn questionnaire_answers(facts: &Map<String, Value>) -> Value {
    let questions = facts
        .get("questions")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[]);

    let mut answers = Vec::new();
    let mut unanswered = Vec::new();

    for (idx, question) in questions.iter().take(200).enumerate() {
        let (id, prompt) = match question {
            Value::Object(q) => (
                scalar_text(q.get("id")).map(|id| clip(&id, 64)),
                text(q, &["text", "question"]),
            ),
            other => (None, scalar_text(Some(other))),
        };
        let id = id.unwrap_or_else(|| format!("q{}", idx + 1));

        let mut answer = json!({
            "question_id": id,
            "answer": PLACEHOLDER,
            "confidence": "none",
        });
        if let Some(prompt) = prompt {
            answer["question"] = json!(clip(&prompt, 1000));
        }

        answers.push(answer);
        unanswered.push(json!(id));
    }

    json!({
        "answers": answers,
        "unanswered": unanswered,
        "draft_notice": FALLBACK_NOTICE,
    })
}

/// First non-empty string (or number) under any of `keys`, redacted
fn text(facts: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| scalar_text(facts.get(*k)))
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if raw.is_empty() {
        None
    } else {
        Some(redact(&raw))
    }
}

fn field(facts: &Map<String, Value>, keys: &[&str], max: usize) -> String {
    text(facts, keys)
        .map(|s| clip(&s, max))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn severity(facts: &Map<String, Value>) -> &'static str {
    facts
        .get("severity")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .and_then(|s| SEVERITIES.iter().copied().find(|known| *known == s))
        .unwrap_or("unknown")
}

fn string_list(value: Option<&Value>, max_items: usize, max_len: usize) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| scalar_text(Some(v)))
            .map(|s| clip(&s, max_len))
            .take(max_items)
            .collect(),
        Some(single) => scalar_text(Some(single))
            .map(|s| vec![clip(&s, max_len)])
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

fn affected_versions(facts: &Map<String, Value>) -> Vec<String> {
    let direct = string_list(facts.get("affected_versions"), 100, 64);
    if !direct.is_empty() {
        return direct;
    }

    facts
        .get("releases")
        .and_then(Value::as_array)
        .map(|releases| {
            releases
                .iter()
                .filter_map(|r| match r {
                    Value::Object(o) => scalar_text(o.get("version")),
                    other => scalar_text(Some(other)),
                })
                .map(|v| clip(&v, 64))
                .take(100)
                .collect()
        })
        .unwrap_or_default()
}

fn timeline(facts: &Map<String, Value>) -> Vec<Value> {
    let Some(entries) = facts.get("timeline").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let date = text(entry, &["date", "at"])?;
            let event = text(entry, &["event", "description"])?;
            Some(json!({"date": clip(&date, 40), "event": clip(&event, 500)}))
        })
        .take(50)
        .collect()
}

fn cve_ids(facts: &Map<String, Value>) -> Vec<String> {
    let Some(re) = CVE_ID.as_ref() else {
        return Vec::new();
    };

    string_list(facts.get("cve_ids"), usize::MAX, 64)
        .into_iter()
        .map(|s| s.to_ascii_uppercase())
        .filter(|s| re.is_match(s))
        .take(50)
        .collect()
}

fn or_placeholder(items: Vec<String>) -> Vec<String> {
    if items.is_empty() {
        vec![PLACEHOLDER.to_string()]
    } else {
        items
    }
}

fn joined(items: &[String]) -> String {
    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

/// Truncate to at most `max` characters
fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_facts_use_placeholders() {
        let doc = fallback_value(JobKind::IncidentDraft, &Value::Null);
        assert_eq!(doc["summary"], PLACEHOLDER);
        assert_eq!(doc["severity"], "unknown");
        assert_eq!(doc["affected_versions"], json!([PLACEHOLDER]));
        assert_eq!(doc["timeline"], json!([]));
        assert_eq!(doc["draft_notice"], FALLBACK_NOTICE);
    }

    #[test]
    fn test_incident_fields_from_facts() {
        let facts = json!({
            "title": "Parser overflow",
            "severity": "HIGH",
            "releases": [{"version": "2.1.0"}, {"version": "2.1.1"}],
            "cve_ids": ["cve-2024-12345", "not-a-cve"],
            "timeline": [
                {"date": "2024-05-01", "event": "Report received"},
                {"date": "2024-05-02"}
            ]
        });
        let doc = fallback_value(JobKind::IncidentDraft, &facts);

        assert_eq!(doc["summary"], "Parser overflow");
        assert_eq!(doc["severity"], "high");
        assert_eq!(doc["affected_versions"], json!(["2.1.0", "2.1.1"]));
        assert_eq!(doc["cve_ids"], json!(["CVE-2024-12345"]));
        assert_eq!(doc["timeline"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_copied_text_is_redacted() {
        let facts = json!({"summary": "Reported by admin@corp.com from 10.0.0.1"});
        let doc = fallback_value(JobKind::IncidentDraft, &facts);
        let summary = doc["summary"].as_str().unwrap();
        assert!(!summary.contains("admin@corp.com"));
        assert!(!summary.contains("10.0.0.1"));
    }

    #[test]
    fn test_long_text_is_clipped() {
        let facts = json!({"title": "x".repeat(500)});
        let doc = fallback_value(JobKind::CommunicationPack, &facts);
        assert_eq!(doc["headline"].as_str().unwrap().chars().count(), 200);
    }

    #[test]
    fn test_questionnaire_ids() {
        let facts = json!({
            "questions": [
                {"id": "AC-1", "text": "Do you enforce MFA?"},
                "Do you encrypt data at rest?",
                {"text": "Who is your DPO?"}
            ]
        });
        let doc = fallback_value(JobKind::QuestionnaireAnswers, &facts);

        assert_eq!(doc["unanswered"], json!(["AC-1", "q2", "q3"]));
        assert_eq!(doc["answers"][0]["confidence"], "none");
        assert_eq!(doc["answers"][1]["question"], "Do you encrypt data at rest?");
    }

    #[test]
    fn test_deterministic() {
        let facts = json!({"title": "Parser overflow", "severity": "low"});
        for kind in JobKind::ALL {
            assert_eq!(fallback(kind, &facts), fallback(kind, &facts));
        }
    }
}

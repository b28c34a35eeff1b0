//! Prompt assembly from caller facts.
//!
//! The requester is an explicit input here; context assembly reads no
//! ambient tenant or user state. The output of `build_user_prompt` is not
//! yet redacted; the orchestrator redacts it exactly once before sending.

use serde_json::Value;

use crate::domain::GenerationTask;

use super::contracts::OutputContract;

/// Render caller facts as a deterministic text block.
///
/// Object keys come out sorted so the same facts always hash the same.
pub fn render_facts(facts: &Value) -> String {
    match facts {
        Value::Null => "No facts were supplied.".to_string(),
        Value::Object(map) if map.is_empty() => "No facts were supplied.".to_string(),
        other => {
            let sorted = sort_keys(other);
            serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| sorted.to_string())
        }
    }
}

/// Build the user prompt for a task under its contract
pub fn build_user_prompt(contract: &OutputContract, task: &GenerationTask) -> String {
    format!(
        "{instruction}\n\nTenant: {tenant}\nDocument type: {kind}\n\nFacts:\n```json\n{facts}\n```\n\nRespond with a single JSON object only.",
        instruction = contract.task_instruction,
        tenant = task.requester.tenant_id,
        kind = contract.kind,
        facts = render_facts(&task.facts),
    )
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

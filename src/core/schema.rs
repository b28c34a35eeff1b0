//! Structural validation of generated JSON against the output contracts.
//!
//! Compiled validators are cached per job kind. The cache is read-mostly:
//! lookups take a shared lock, and a miss compiles outside any lock before
//! inserting with `or_insert`, so two racing loaders just waste one compile.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, error};

use crate::domain::JobKind;

use super::contracts::contract_for;

/// Result of validating one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the document satisfies the contract
    pub valid: bool,

    /// All violations, joined with "; " (empty when valid)
    pub errors: String,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: String::new(),
        }
    }

    fn invalid(errors: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: errors.into(),
        }
    }
}

/// Validates JSON text against the contract schema of a job kind
#[derive(Default)]
pub struct SchemaValidator {
    cache: RwLock<HashMap<JobKind, Arc<Validator>>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `json_text` against the contract for `kind`.
    ///
    /// Never errors: parse failures and schema violations both come back as
    /// `valid == false` with a readable message.
    pub fn validate(&self, json_text: &str, kind: JobKind) -> ValidationOutcome {
        let instance: Value = match serde_json::from_str(json_text) {
            Ok(value) => value,
            Err(e) => return ValidationOutcome::invalid(format!("Invalid JSON: {}", e)),
        };

        self.validate_value(&instance, kind)
    }

    /// Validate an already-parsed document
    pub fn validate_value(&self, instance: &Value, kind: JobKind) -> ValidationOutcome {
        let validator = match self.validator_for(kind) {
            Ok(v) => v,
            Err(message) => return ValidationOutcome::invalid(message),
        };

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::invalid(errors.join("; "))
        }
    }

    /// Get the compiled validator for a kind, compiling it on first use
    fn validator_for(&self, kind: JobKind) -> Result<Arc<Validator>, String> {
        if let Ok(cache) = self.cache.read() {
            if let Some(v) = cache.get(&kind) {
                return Ok(Arc::clone(v));
            }
        }

        let compiled = Arc::new(compile(kind)?);
        debug!(%kind, "Compiled output schema");

        match self.cache.write() {
            Ok(mut cache) => Ok(Arc::clone(cache.entry(kind).or_insert(compiled))),
            // A poisoned cache still holds only complete validators; skip caching.
            Err(_) => Ok(compiled),
        }
    }

    /// Number of compiled schemas currently cached
    pub fn cached_schemas(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

fn compile(kind: JobKind) -> Result<Validator, String> {
    let contract = contract_for(kind);

    let schema: Value = serde_json::from_str(contract.schema).map_err(|e| {
        error!(%kind, error = %e, "Contract schema is not valid JSON");
        format!("Schema for {} is not valid JSON: {}", kind, e)
    })?;

    jsonschema::validator_for(&schema).map_err(|e| {
        error!(%kind, error = %e, "Contract schema failed to compile");
        format!("Schema for {} failed to compile: {}", kind, e)
    })
}

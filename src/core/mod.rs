//! Core generation logic.
//!
//! This module contains:
//! - Redactor: Sensitive-pattern scrubbing before prompts leave the process
//! - Contracts: Per-kind schema, system prompt and artifact kind
//! - SchemaValidator: Cached JSON Schema validation
//! - Extractor: Pulls the JSON document out of raw model text
//! - GenerationClient: Model round-trips with timeout and transport retry
//! - Fallback: Deterministic schema-valid drafts
//! - JobStore: Append-only job and artifact persistence
//! - Orchestrator: The job state machine

pub mod client;
pub mod context;
pub mod contracts;
pub mod extractor;
pub mod fallback;
pub mod job_store;
pub mod orchestrator;
pub mod redactor;
pub mod schema;

// Re-export commonly used types
pub use client::{
    ClientSettings, GenerationClient, GenerationFailure, Generator, MetricsSnapshot, RetryPolicy,
};
pub use context::build_user_prompt;
pub use contracts::{contract_for, OutputContract, CONTRACTS};
pub use extractor::extract;
pub use fallback::{fallback, fallback_value, FALLBACK_NOTICE, PLACEHOLDER};
pub use job_store::{hash_content, FileJobStore, JobRepository, StoreError};
pub use orchestrator::{JobOrchestrator, OrchestratorError, DEFAULT_MAX_ATTEMPTS};
pub use redactor::{redact, redaction_counts};
pub use schema::{SchemaValidator, ValidationOutcome};

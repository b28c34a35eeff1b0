//! regdraft - Compliance draft generation over a local model
//!
//! Turns structured incident facts into schema-validated compliance drafts:
//! incident disclosures, communication packs and security questionnaire
//! answers.
//!
//! # Architecture
//!
//! Every request runs through one state machine:
//! - Caller facts are assembled into a prompt and redacted before leaving
//!   the process
//! - Model output is extracted, validated against the kind's JSON Schema and
//!   retried on failure
//! - When every attempt fails, a deterministic template supplies a
//!   schema-valid draft, so each job ends with exactly one artifact
//!
//! # Modules
//!
//! - `adapters`: Model server transports (Ollama)
//! - `core`: Redaction, contracts, validation, generation, orchestration
//! - `domain`: Data structures (GenerationJob, GenerationArtifact, GenerationTask)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Draft an incident disclosure from a facts file
//! regdraft run incident-draft --facts facts.json --tenant acme --user jdoe
//!
//! # Inspect a job and its artifact
//! regdraft show <job-id>
//!
//! # Check what would be sent to the model
//! echo "mail admin@corp.com" | regdraft redact
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{FileJobStore, GenerationClient, JobOrchestrator, SchemaValidator};
pub use crate::domain::{
    ArtifactKind, GenerationArtifact, GenerationJob, GenerationTask, JobKind, JobStatus, Requester,
};

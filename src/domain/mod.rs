//! Domain types for regdraft.
//!
//! This module contains the core data structures:
//! - Job: audit record and lifecycle of one drafting request
//! - Artifact: the persisted draft payload
//! - Task: what the caller asks for

pub mod artifact;
pub mod job;
pub mod task;

// Re-export commonly used types
pub use artifact::{ArtifactKind, GenerationArtifact};
pub use job::{GenerationJob, JobKind, JobStatus, TransitionError};
pub use task::{GenerationTask, Requester};

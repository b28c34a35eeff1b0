//! Job orchestrator: the generation state machine.
//!
//! PENDING -> RUNNING -> COMPLETED | FAILED. A run always ends with a
//! terminal job and exactly one artifact. When no attempt yields output that
//! passes the contract schema, the job is marked FAILED and the fallback
//! template supplies the artifact under the same artifact kind, so callers
//! never branch on which path produced it.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{GenerationArtifact, GenerationJob, GenerationTask, TransitionError};

use super::client::Generator;
use super::context::build_user_prompt;
use super::contracts::contract_for;
use super::extractor::extract;
use super::fallback::fallback;
use super::job_store::{hash_content, JobRepository, StoreError};
use super::redactor::{redact, redaction_counts};
use super::schema::SchemaValidator;

/// Attempts per job: the initial call plus two semantic retries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The fallback template produced a document its own schema rejects.
    /// This is a defect in the templates, never a runtime condition.
    #[error("Fallback output for {kind} failed schema validation: {errors}")]
    FallbackInvalid { kind: String, errors: String },

    #[error("Job {0} not found")]
    NotFound(Uuid),
}

/// Why the last attempt did not produce an accepted document
enum AttemptFailure {
    Transport(String),
    Validation(String),
}

/// Drives generation jobs end to end
pub struct JobOrchestrator {
    generator: Arc<dyn Generator>,
    store: Arc<dyn JobRepository>,
    validator: Arc<SchemaValidator>,
    max_attempts: u32,
}

impl JobOrchestrator {
    /// Create an orchestrator
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn JobRepository>,
        validator: Arc<SchemaValidator>,
    ) -> Self {
        Self {
            generator,
            store,
            validator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the number of generation attempts (minimum 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Run a generation task to a terminal job.
    ///
    /// Resolves only after every attempt and all persistence are done.
    #[instrument(skip(self, task), fields(kind = %task.kind, tenant = %task.requester.tenant_id))]
    pub async fn run_job(&self, task: &GenerationTask) -> Result<GenerationJob, OrchestratorError> {
        let contract = contract_for(task.kind);

        // Assemble and redact the prompt before anything leaves the process
        let prompt = build_user_prompt(contract, task);
        let redactions: usize = redaction_counts(&prompt).iter().map(|(_, n)| n).sum();
        let prompt = redact(&prompt);

        let mut job = GenerationJob::new(
            task.kind,
            &task.requester,
            self.generator.model_id(),
            hash_content(&prompt),
        );
        job.mark_running()?;
        self.store.save_job(&job).await?;

        info!(
            job_id = %job.id,
            input_hash = %job.input_hash,
            redactions,
            "Job started"
        );

        let mut accepted: Option<String> = None;
        let mut last_failure: Option<AttemptFailure> = None;
        let mut attempts = 0u32;

        while attempts < self.max_attempts {
            attempts += 1;
            let attempt_start = Instant::now();

            let result = self.generator.generate(contract.system_prompt, &prompt).await;
            let completion = match result {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        attempt = attempts,
                        error = %e,
                        "Generation attempt failed"
                    );
                    last_failure = Some(AttemptFailure::Transport(e.to_string()));
                    continue;
                }
            };

            let candidate = extract(&completion);
            let outcome = self.validator.validate(&candidate, task.kind);
            let duration_ms = attempt_start.elapsed().as_millis() as u64;

            if outcome.valid {
                info!(job_id = %job.id, attempt = attempts, duration_ms, "Output accepted");
                accepted = Some(candidate);
                break;
            }

            warn!(
                job_id = %job.id,
                attempt = attempts,
                duration_ms,
                errors = %outcome.errors,
                "Output failed validation"
            );
            last_failure = Some(AttemptFailure::Validation(outcome.errors));
        }

        match accepted {
            Some(content) => {
                job.complete(hash_content(&content), attempts)?;
                let artifact =
                    GenerationArtifact::new(job.id, contract.artifact_kind, content, false);
                self.store.save_artifact(&artifact).await?;
                self.store.save_job(&job).await?;

                info!(job_id = %job.id, output_hash = ?job.output_hash, "Job completed");
            }
            None => {
                let reason = match last_failure {
                    Some(AttemptFailure::Validation(errors)) => format!(
                        "validation failed after {} attempts: {}",
                        attempts, errors
                    ),
                    Some(AttemptFailure::Transport(message)) => format!(
                        "transport failure after {} attempts: {}",
                        attempts, message
                    ),
                    None => format!("no output after {} attempts", attempts),
                };

                let content = fallback(task.kind, &task.facts);
                let check = self.validator.validate(&content, task.kind);
                if !check.valid {
                    error!(job_id = %job.id, errors = %check.errors, "Fallback output is invalid");
                    return Err(OrchestratorError::FallbackInvalid {
                        kind: task.kind.to_string(),
                        errors: check.errors,
                    });
                }

                job.fail(reason, attempts)?;
                let artifact =
                    GenerationArtifact::new(job.id, contract.artifact_kind, content, true);
                self.store.save_artifact(&artifact).await?;
                self.store.save_job(&job).await?;

                warn!(job_id = %job.id, error = ?job.error, "Job failed, fallback artifact stored");
            }
        }

        Ok(job)
    }

    /// Load a job and its artifacts
    pub async fn get_job(
        &self,
        id: Uuid,
    ) -> Result<(GenerationJob, Vec<GenerationArtifact>), OrchestratorError> {
        let job = self
            .store
            .find_job(id)
            .await?
            .ok_or(OrchestratorError::NotFound(id))?;
        let artifacts = self.store.find_artifacts_by_job(id).await?;
        Ok((job, artifacts))
    }

    /// List recent jobs
    pub async fn list_jobs(&self, limit: usize) -> Result<Vec<GenerationJob>, OrchestratorError> {
        Ok(self.store.list_jobs(limit).await?)
    }
}

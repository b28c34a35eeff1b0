//! Generation job state and transitions.
//!
//! A GenerationJob is the audit record of a single drafting request. It is
//! persisted once when it starts running and once more when it reaches a
//! terminal state, after which it is never mutated again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::task::Requester;

/// Kind of draft a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Regulator-facing incident disclosure draft
    IncidentDraft,

    /// Customer/regulator/internal communication pack
    CommunicationPack,

    /// Answers to a security questionnaire
    QuestionnaireAnswers,
}

impl JobKind {
    /// All job kinds, in declaration order
    pub const ALL: [JobKind; 3] = [
        JobKind::IncidentDraft,
        JobKind::CommunicationPack,
        JobKind::QuestionnaireAnswers,
    ];

    /// Stable snake_case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::IncidentDraft => "incident_draft",
            JobKind::CommunicationPack => "communication_pack",
            JobKind::QuestionnaireAnswers => "questionnaire_answers",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "incident_draft" => Ok(JobKind::IncidentDraft),
            "communication_pack" => Ok(JobKind::CommunicationPack),
            "questionnaire_answers" => Ok(JobKind::QuestionnaireAnswers),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Constructed, not yet persisted
    Pending,

    /// Persisted, attempts in progress
    Running,

    /// Validated model output persisted
    Completed,

    /// Attempts exhausted, fallback output persisted
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid job transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Audit record of one drafting request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Unique identifier for this job
    pub id: Uuid,

    /// Tenant that owns the job
    pub tenant_id: String,

    /// What is being drafted
    pub kind: JobKind,

    /// Current status
    pub status: JobStatus,

    /// Model identifier used for generation
    pub model: String,

    /// SHA-256 of the redacted user prompt
    pub input_hash: String,

    /// SHA-256 of the accepted model output (only when completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,

    /// Why the job failed (only when failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// User who requested the draft
    pub requested_by: String,

    /// Generation attempts made
    #[serde(default)]
    pub attempts: u32,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Create a pending job
    pub fn new(
        kind: JobKind,
        requester: &Requester,
        model: impl Into<String>,
        input_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: requester.tenant_id.clone(),
            kind,
            status: JobStatus::Pending,
            model: model.into(),
            input_hash: input_hash.into(),
            output_hash: None,
            error: None,
            requested_by: requester.user_id.clone(),
            attempts: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// PENDING -> RUNNING
    pub fn mark_running(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Running)
    }

    /// RUNNING -> COMPLETED
    pub fn complete(&mut self, output_hash: String, attempts: u32) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        self.output_hash = Some(output_hash);
        self.attempts = attempts;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// RUNNING -> FAILED
    pub fn fail(&mut self, error: String, attempts: u32) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        self.attempts = attempts;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        );

        if !allowed {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }

        self.status = to;
        Ok(())
    }
}

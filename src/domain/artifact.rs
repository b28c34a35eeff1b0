//! Artifacts produced by generation jobs.
//!
//! Exactly one artifact is written per job, whether the content came from
//! the model or from the deterministic fallback.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted draft payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationArtifact {
    /// Unique identifier for this artifact
    pub id: Uuid,

    /// Job that produced this artifact
    pub job_id: Uuid,

    /// Type of artifact
    pub kind: ArtifactKind,

    /// Raw JSON content
    pub content: String,

    /// SHA-256 of the content
    pub content_hash: String,

    /// Produced by the deterministic fallback rather than the model
    #[serde(default)]
    pub fallback: bool,

    /// When the artifact was created
    pub created_at: DateTime<Utc>,
}

impl GenerationArtifact {
    /// Create a new artifact
    pub fn new(job_id: Uuid, kind: ArtifactKind, content: String, fallback: bool) -> Self {
        let content_hash = crate::core::hash_content(&content);
        Self {
            id: Uuid::new_v4(),
            job_id,
            kind,
            content,
            content_hash,
            fallback,
            created_at: Utc::now(),
        }
    }

    /// Parse the content as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.content)
    }
}

/// Types of artifacts that can be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    /// Incident disclosure draft
    IncidentDraft,

    /// Communication pack
    CommunicationPack,

    /// Questionnaire answers
    QuestionnaireAnswers,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::IncidentDraft => "INCIDENT_DRAFT",
            ArtifactKind::CommunicationPack => "COMMUNICATION_PACK",
            ArtifactKind::QuestionnaireAnswers => "QUESTIONNAIRE_ANSWERS",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_creation() {
        let job_id = Uuid::new_v4();
        let artifact = GenerationArtifact::new(
            job_id,
            ArtifactKind::IncidentDraft,
            "{\"summary\":\"x\"}".to_string(),
            false,
        );

        assert_eq!(artifact.job_id, job_id);
        assert_eq!(artifact.kind, ArtifactKind::IncidentDraft);
        assert_eq!(artifact.content_hash.len(), 64);
        assert!(!artifact.fallback);
    }

    #[test]
    fn test_artifact_serialization() {
        let artifact = GenerationArtifact::new(
            Uuid::new_v4(),
            ArtifactKind::CommunicationPack,
            "{}".to_string(),
            true,
        );

        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"COMMUNICATION_PACK\""));

        let parsed: GenerationArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, artifact);
    }
}

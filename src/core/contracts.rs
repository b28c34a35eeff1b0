//! Output contracts: one (system prompt, schema, artifact kind) record per job kind.
//!
//! Schemas are published as versioned resources under `schemas/` and embedded
//! at compile time. Evolution is additive only: a new version may add optional
//! properties but never tighten existing ones, so stored artifacts stay valid.

use crate::domain::{ArtifactKind, JobKind};

/// Static contract for one job kind
#[derive(Debug)]
pub struct OutputContract {
    /// Job kind this contract serves
    pub kind: JobKind,

    /// Artifact label written on success and on fallback alike
    pub artifact_kind: ArtifactKind,

    /// Published schema version
    pub schema_version: &'static str,

    /// JSON Schema source
    pub schema: &'static str,

    /// System/instruction prompt. Never contains tenant data.
    pub system_prompt: &'static str,

    /// Lead-in of the user prompt, placed before the facts block
    pub task_instruction: &'static str,
}

pub static INCIDENT_DRAFT: OutputContract = OutputContract {
    kind: JobKind::IncidentDraft,
    artifact_kind: ArtifactKind::IncidentDraft,
    schema_version: "v1",
    schema: include_str!("../../schemas/incident_draft.v1.json"),
    system_prompt: "You draft security incident disclosures for submission to a regulator. \
Use only the facts supplied by the user; never invent versions, dates, CVE identifiers or impact. \
If a fact is missing, write \"[ANALYST INPUT REQUIRED]\" instead of guessing. \
Respond with exactly one JSON object and nothing else. Allowed properties: \
summary (string), severity (one of critical, high, medium, low, unknown), \
affected_versions (non-empty array of strings), impact (string), root_cause (string, optional), \
mitigations (array of strings), timeline (array of {date, event}), \
cve_ids (array of CVE-YYYY-NNNN strings, optional). No other properties are allowed.",
    task_instruction: "Draft an incident disclosure from the following facts.",
};

pub static COMMUNICATION_PACK: OutputContract = OutputContract {
    kind: JobKind::CommunicationPack,
    artifact_kind: ArtifactKind::CommunicationPack,
    schema_version: "v1",
    schema: include_str!("../../schemas/communication_pack.v1.json"),
    system_prompt: "You prepare incident communication packs for a compliance team. \
Use only the facts supplied by the user and keep a factual, non-speculative tone. \
If a fact is missing, write \"[ANALYST INPUT REQUIRED]\" instead of guessing. \
Respond with exactly one JSON object and nothing else. Allowed properties: \
headline (string, at most 200 characters), internal_summary (string), customer_notice (string), \
regulator_notice (string), faq (array of at most 10 {question, answer} objects). \
No other properties are allowed.",
    task_instruction: "Prepare a communication pack from the following facts.",
};

pub static QUESTIONNAIRE_ANSWERS: OutputContract = OutputContract {
    kind: JobKind::QuestionnaireAnswers,
    artifact_kind: ArtifactKind::QuestionnaireAnswers,
    schema_version: "v1",
    schema: include_str!("../../schemas/questionnaire_answers.v1.json"),
    system_prompt: "You answer security questionnaires on behalf of a software vendor. \
Answer only from the facts supplied by the user. When the facts do not support an answer, \
set confidence to \"none\", answer \"[ANALYST INPUT REQUIRED]\" and list the question id in unanswered. \
Respond with exactly one JSON object and nothing else. Allowed properties: \
answers (array of {question_id, question, answer, confidence (high, medium, low, none), evidence_refs}), \
unanswered (array of question ids). No other properties are allowed.",
    task_instruction: "Answer the questionnaire in the following facts.",
};

/// Every contract, in job kind order
pub static CONTRACTS: [&OutputContract; 3] =
    [&INCIDENT_DRAFT, &COMMUNICATION_PACK, &QUESTIONNAIRE_ANSWERS];

/// Look up the contract for a job kind
pub fn contract_for(kind: JobKind) -> &'static OutputContract {
    match kind {
        JobKind::IncidentDraft => &INCIDENT_DRAFT,
        JobKind::CommunicationPack => &COMMUNICATION_PACK,
        JobKind::QuestionnaireAnswers => &QUESTIONNAIRE_ANSWERS,
    }
}

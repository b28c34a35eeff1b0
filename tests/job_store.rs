//! Job Store Integration Tests
//!
//! Tests for the JSONL record format, snapshot replay and concurrent appends.

use std::sync::Arc;

use regdraft::core::{hash_content, FileJobStore, JobRepository};
use regdraft::domain::{ArtifactKind, GenerationArtifact, GenerationJob, JobKind, JobStatus, Requester};
use tempfile::TempDir;

fn new_job(kind: JobKind) -> GenerationJob {
    GenerationJob::new(
        kind,
        &Requester::new("acme", "jdoe"),
        "llama3.1:8b",
        hash_content("prompt"),
    )
}

#[tokio::test]
async fn test_job_record_format() {
    let mut job = new_job(JobKind::IncidentDraft);
    job.mark_running().unwrap();

    let json: serde_json::Value = serde_json::to_value(&job).unwrap();

    assert_eq!(json["status"], "RUNNING");
    assert_eq!(json["kind"], "incident_draft");
    assert_eq!(json["tenant_id"], "acme");
    assert_eq!(json["requested_by"], "jdoe");
    assert_eq!(json["input_hash"].as_str().unwrap().len(), 64);
    // Unset optional fields are omitted
    assert!(json.get("output_hash").is_none());
    assert!(json.get("error").is_none());
    assert!(json.get("completed_at").is_none());
}

#[tokio::test]
async fn test_artifact_record_format() {
    let job = new_job(JobKind::CommunicationPack);
    let artifact = GenerationArtifact::new(
        job.id,
        ArtifactKind::CommunicationPack,
        "{\"headline\":\"x\"}".to_string(),
        true,
    );

    let json: serde_json::Value = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["kind"], "COMMUNICATION_PACK");
    assert_eq!(json["fallback"], true);
    assert_eq!(json["content_hash"], hash_content("{\"headline\":\"x\"}"));
}

#[tokio::test]
async fn test_running_then_terminal_keeps_both_rows() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::open(temp.path()).await.unwrap();

    let mut job = new_job(JobKind::IncidentDraft);
    job.mark_running().unwrap();
    store.save_job(&job).await.unwrap();
    job.fail("validation failed after 3 attempts: x".to_string(), 3)
        .unwrap();
    store.save_job(&job).await.unwrap();

    // Both snapshots stay on disk as the audit trail
    let raw = tokio::fs::read_to_string(store.dir().join("jobs.jsonl"))
        .await
        .unwrap();
    let rows: Vec<GenerationJob> = raw
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, JobStatus::Running);
    assert_eq!(rows[1].status, JobStatus::Failed);

    // Lookups see the latest
    let found = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(found.status, JobStatus::Failed);
    assert_eq!(found.attempts, 3);
}

#[tokio::test]
async fn test_reopen_replays_existing_logs() {
    let temp = TempDir::new().unwrap();

    let mut job = new_job(JobKind::QuestionnaireAnswers);
    job.mark_running().unwrap();
    job.complete(hash_content("{}"), 1).unwrap();
    let artifact = GenerationArtifact::new(
        job.id,
        ArtifactKind::QuestionnaireAnswers,
        "{}".to_string(),
        false,
    );

    {
        let store = FileJobStore::open(temp.path()).await.unwrap();
        store.save_artifact(&artifact).await.unwrap();
        store.save_job(&job).await.unwrap();
    }

    let store = FileJobStore::open(temp.path()).await.unwrap();
    assert_eq!(store.find_job(job.id).await.unwrap(), Some(job.clone()));
    assert_eq!(
        store.find_artifacts_by_job(job.id).await.unwrap(),
        vec![artifact]
    );
}

#[tokio::test]
async fn test_list_jobs_newest_first_with_limit() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::open(temp.path()).await.unwrap();

    let mut ids = Vec::new();
    for kind in JobKind::ALL {
        let mut job = new_job(kind);
        job.mark_running().unwrap();
        store.save_job(&job).await.unwrap();
        ids.push(job.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed = store.list_jobs(2).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, ids[2]);
    assert_eq!(listed[1].id, ids[1]);
}

#[tokio::test]
async fn test_concurrent_appends_do_not_interleave() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileJobStore::open(temp.path()).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut job = new_job(JobKind::IncidentDraft);
            job.mark_running().unwrap();
            store.save_job(&job).await.unwrap();
            job.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    // Every line parses, so no two appends were interleaved
    let jobs = store.list_jobs(100).await.unwrap();
    assert_eq!(jobs.len(), 20);
    for id in ids {
        assert!(jobs.iter().any(|j| j.id == id));
    }
}

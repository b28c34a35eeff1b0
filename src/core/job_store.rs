//! Append-only job and artifact store with file-based persistence.
//!
//! Jobs and artifacts are stored as newline-delimited JSON (JSONL). Saving a
//! job appends a snapshot; replay keeps the latest snapshot per job id, so a
//! crash between RUNNING and a terminal state leaves the RUNNING row behind
//! as the audit trace.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{GenerationArtifact, GenerationJob};

/// Errors that can occur in the job store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Persistence operations the orchestrator needs
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert or update a job
    async fn save_job(&self, job: &GenerationJob) -> Result<(), StoreError>;

    /// Append an artifact
    async fn save_artifact(&self, artifact: &GenerationArtifact) -> Result<(), StoreError>;

    /// Latest state of a job
    async fn find_job(&self, id: Uuid) -> Result<Option<GenerationJob>, StoreError>;

    /// All artifacts owned by a job
    async fn find_artifacts_by_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<GenerationArtifact>, StoreError>;

    /// Most recent jobs first
    async fn list_jobs(&self, limit: usize) -> Result<Vec<GenerationJob>, StoreError>;
}

/// File-based store using JSONL format
pub struct FileJobStore {
    /// Directory containing the logs
    dir: PathBuf,

    /// Path to the jobs.jsonl file
    jobs_path: PathBuf,

    /// Path to the artifacts.jsonl file
    artifacts_path: PathBuf,

    /// Serializes appends within this process
    write_lock: Mutex<()>,
}

impl FileJobStore {
    /// Create or open a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        Ok(Self {
            jobs_path: dir.join("jobs.jsonl"),
            artifacts_path: dir.join("artifacts.jsonl"),
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Open the store in the configured location ($REGDRAFT_HOME/jobs)
    pub async fn open_default() -> anyhow::Result<Self> {
        let dir = crate::config::jobs_dir()?;
        Ok(Self::open(dir).await?)
    }

    /// Get the store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one JSON line under an exclusive file lock
    async fn append<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), StoreError> {
        let line = format!("{}\n", serde_json::to_string(record)?);
        let path = path.to_path_buf();

        let _guard = self.write_lock.lock().await;
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            file.lock_exclusive()?;
            let result = file.write_all(line.as_bytes()).and_then(|_| file.flush());
            let _ = file.unlock();
            result.map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Replay all records in order
    async fn replay<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut records = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }

    /// Latest snapshot per job id, in first-seen order
    async fn latest_jobs(&self) -> Result<Vec<GenerationJob>, StoreError> {
        let snapshots: Vec<GenerationJob> = self.replay(&self.jobs_path).await?;

        let mut order: Vec<Uuid> = Vec::new();
        let mut latest: HashMap<Uuid, GenerationJob> = HashMap::new();
        for job in snapshots {
            if !latest.contains_key(&job.id) {
                order.push(job.id);
            }
            latest.insert(job.id, job);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }
}

#[async_trait]
impl JobRepository for FileJobStore {
    async fn save_job(&self, job: &GenerationJob) -> Result<(), StoreError> {
        self.append(&self.jobs_path, job).await
    }

    async fn save_artifact(&self, artifact: &GenerationArtifact) -> Result<(), StoreError> {
        self.append(&self.artifacts_path, artifact).await
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<GenerationJob>, StoreError> {
        let snapshots: Vec<GenerationJob> = self.replay(&self.jobs_path).await?;
        Ok(snapshots.into_iter().rev().find(|j| j.id == id))
    }

    async fn find_artifacts_by_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<GenerationArtifact>, StoreError> {
        let artifacts: Vec<GenerationArtifact> = self.replay(&self.artifacts_path).await?;
        Ok(artifacts.into_iter().filter(|a| a.job_id == job_id).collect())
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<GenerationJob>, StoreError> {
        let mut jobs = self.latest_jobs().await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

/// SHA-256 of content as lowercase hex
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactKind, JobKind, Requester};
    use tempfile::TempDir;

    fn job() -> GenerationJob {
        GenerationJob::new(
            JobKind::IncidentDraft,
            &Requester::new("acme", "jdoe"),
            "llama3",
            hash_content("prompt"),
        )
    }

    #[tokio::test]
    async fn test_latest_snapshot_wins() {
        let temp = TempDir::new().unwrap();
        let store = FileJobStore::open(temp.path()).await.unwrap();

        let mut job = job();
        job.mark_running().unwrap();
        store.save_job(&job).await.unwrap();
        job.complete(hash_content("{}"), 1).unwrap();
        store.save_job(&job).await.unwrap();

        let found = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(found, job);
        assert_eq!(store.list_jobs(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_job() {
        let temp = TempDir::new().unwrap();
        let store = FileJobStore::open(temp.path()).await.unwrap();
        assert!(store.find_job(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.list_jobs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_artifacts_filtered_by_job() {
        let temp = TempDir::new().unwrap();
        let store = FileJobStore::open(temp.path()).await.unwrap();

        let a = GenerationArtifact::new(Uuid::new_v4(), ArtifactKind::IncidentDraft, "{}".into(), false);
        let b = GenerationArtifact::new(Uuid::new_v4(), ArtifactKind::IncidentDraft, "{}".into(), true);
        store.save_artifact(&a).await.unwrap();
        store.save_artifact(&b).await.unwrap();

        let found = store.find_artifacts_by_job(a.job_id).await.unwrap();
        assert_eq!(found, vec![a]);
    }

    #[test]
    fn test_hash_content() {
        let h1 = hash_content("test input");
        let h2 = hash_content("test input");
        let h3 = hash_content("different input");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 64);
        assert_eq!(
            hash_content(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

//! Asynchronous job coordination
//!
//! Train/predict work runs on background workers, decoupled from the
//! request that submitted it. The coordinator owns a thread-safe job
//! table; each record is mutated only by its own worker after creation.
//! Records live for the process lifetime and are never deleted.

use crate::error::{ExoSeekrError, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Kind of work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Train,
    Predict,
}

/// Job lifecycle state. Transitions are one-directional:
/// PENDING -> RUNNING -> COMPLETED | FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Failure payload captured into a FAILED job
#[derive(Debug, Clone, Serialize)]
pub struct JobError {
    pub message: String,
    pub trace: String,
}

/// One tracked unit of work
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Listing row: a record without its payload
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// Owns the job table and schedules workers.
///
/// The coordinator never inspects job content: work is an opaque closure
/// returning the JSON result payload.
#[derive(Clone, Default)]
pub struct JobCoordinator {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl JobCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a job record, schedule the work on a blocking worker, and
    /// return the job id immediately.
    pub async fn submit<F>(&self, kind: JobKind, work: F) -> String
    where
        F: FnOnce() -> Result<serde_json::Value> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let record = JobRecord {
            id: id.clone(),
            kind,
            status: JobStatus::Pending,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        };
        self.jobs.write().await.insert(id.clone(), record);

        let jobs = Arc::clone(&self.jobs);
        let job_id = id.clone();
        tokio::spawn(async move {
            {
                let mut guard = jobs.write().await;
                if let Some(job) = guard.get_mut(&job_id) {
                    job.status = JobStatus::Running;
                    job.started_at = Some(Utc::now().to_rfc3339());
                }
            }

            let outcome = tokio::task::spawn_blocking(work).await;

            let mut guard = jobs.write().await;
            if let Some(job) = guard.get_mut(&job_id) {
                job.finished_at = Some(Utc::now().to_rfc3339());
                match outcome {
                    Ok(Ok(value)) => {
                        job.status = JobStatus::Completed;
                        job.result = Some(value);
                        tracing::info!(job_id = %job.id, kind = ?job.kind, "job completed");
                    }
                    Ok(Err(err)) => {
                        job.status = JobStatus::Failed;
                        tracing::error!(job_id = %job.id, kind = ?job.kind, %err, "job failed");
                        job.error = Some(JobError {
                            message: err.to_string(),
                            trace: format!("{err:?}"),
                        });
                    }
                    Err(join_err) => {
                        job.status = JobStatus::Failed;
                        tracing::error!(job_id = %job.id, %join_err, "job worker panicked");
                        job.error = Some(JobError {
                            message: "job worker panicked".to_string(),
                            trace: join_err.to_string(),
                        });
                    }
                }
            }
        });

        id
    }

    /// Read-only snapshot of a job record.
    pub async fn poll(&self, job_id: &str) -> Result<JobRecord> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| ExoSeekrError::NotFound("Job ID not found".to_string()))
    }

    /// Summaries of every job, newest-started first.
    pub async fn list(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<JobSummary> = self
            .jobs
            .read()
            .await
            .values()
            .map(|job| JobSummary {
                id: job.id.clone(),
                kind: job.kind,
                status: job.status,
                started_at: job.started_at.clone(),
                finished_at: job.finished_at.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries
    }
}

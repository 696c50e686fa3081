//! Job lifecycle event payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Checkpoint, ContractJob, JobStatus};

/// What happened to the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// A new job was accepted.
    Submitted,
    /// A pipeline checkpoint was recorded.
    Progress { checkpoint: Checkpoint },
    /// The job completed.
    Completed { gaps: usize },
    /// The job failed.
    Failed { error: String },
}

/// A job lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(flatten)]
    pub kind: JobEventKind,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Build an event from the current job snapshot.
    pub fn from_job(job: &ContractJob, kind: JobEventKind) -> Self {
        Self {
            job_id: job.id().to_string(),
            status: job.status(),
            progress: job.progress(),
            message: job.progress_message().to_string(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            JobEventKind::Submitted => "job.submitted",
            JobEventKind::Progress { .. } => "job.progress",
            JobEventKind::Completed { .. } => "job.completed",
            JobEventKind::Failed { .. } => "job.failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

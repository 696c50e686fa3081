//! Contract job lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::error::{PactumError, PactumResult};

/// Processing status of a contract job.
///
/// `Completed` and `Failed` are terminal: once reached, nothing about the job
/// changes again.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and waiting for a worker.
    Pending,
    /// Claimed by a worker; the pipeline is running.
    Processing,
    /// Record persisted; result available.
    Completed,
    /// Pipeline aborted; error message available.
    Failed,
}

impl JobStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Validate a lifecycle transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Static string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Pipeline boundaries at which progress is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Intake,
    Ingested,
    StrategiesComplete,
    Analyzed,
    Persisted,
}

impl Checkpoint {
    /// Progress percentage reported at this checkpoint.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Intake => 0,
            Self::Ingested => 25,
            Self::StrategiesComplete => 50,
            Self::Analyzed => 75,
            Self::Persisted => 100,
        }
    }

    /// Human-readable progress message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Intake => "Queued for processing",
            Self::Ingested => "Document ingested",
            Self::StrategiesComplete => "Field extraction complete",
            Self::Analyzed => "Results consolidated and checked for gaps",
            Self::Persisted => "Processing complete",
        }
    }
}

/// One submitted contract and its processing state.
///
/// Fields are readable through accessors only. The orchestrator changes a job
/// exclusively through the validated mutators below, each of which refuses to
/// touch a terminal job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractJob {
    pub(crate) id: String,
    pub(crate) filename: String,
    pub(crate) file_size_bytes: u64,
    pub(crate) uploaded_at: DateTime<Utc>,
    pub(crate) status: JobStatus,
    pub(crate) progress: u8,
    pub(crate) progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) processed_at: Option<DateTime<Utc>>,
    pub(crate) attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) retry_of: Option<String>,
}

impl ContractJob {
    /// Create a new pending job.
    pub fn new(filename: impl Into<String>, file_size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            file_size_bytes,
            uploaded_at: Utc::now(),
            status: JobStatus::Pending,
            progress: Checkpoint::Intake.progress(),
            progress_message: Checkpoint::Intake.message().to_string(),
            error: None,
            processed_at: None,
            attempt: 1,
            retry_of: None,
        }
    }

    /// Create the pending job that retries `previous`.
    ///
    /// The previous job is left untouched.
    pub fn retry_of(previous: &ContractJob) -> Self {
        let mut job = Self::new(previous.filename.clone(), previous.file_size_bytes);
        job.attempt = previous.attempt + 1;
        job.retry_of = Some(previous.id.clone());
        job
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Progress percentage, 0 to 100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn progress_message(&self) -> &str {
        &self.progress_message
    }

    /// Failure message, set only on failed jobs.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Completion or failure time.
    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Id of the failed job this one retries.
    pub fn retry_of_id(&self) -> Option<&str> {
        self.retry_of.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, next: JobStatus) -> PactumResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(PactumError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// pending -> processing.
    pub fn claim(&mut self) -> PactumResult<()> {
        self.transition(JobStatus::Processing)
    }

    /// Record a progress checkpoint on a processing job.
    ///
    /// Checkpoints below the current progress are rejected so that progress
    /// never decreases.
    pub fn checkpoint(&mut self, checkpoint: Checkpoint) -> PactumResult<()> {
        if self.status != JobStatus::Processing {
            return Err(PactumError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: JobStatus::Processing,
            });
        }
        if checkpoint.progress() < self.progress {
            return Err(PactumError::validation(format!(
                "progress for job {} cannot move from {} back to {}",
                self.id,
                self.progress,
                checkpoint.progress()
            )));
        }
        self.progress = checkpoint.progress();
        self.progress_message = checkpoint.message().to_string();
        Ok(())
    }

    /// processing -> completed, at 100%.
    pub fn complete(&mut self) -> PactumResult<()> {
        self.transition(JobStatus::Completed)?;
        self.progress = Checkpoint::Persisted.progress();
        self.progress_message = Checkpoint::Persisted.message().to_string();
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// processing -> failed. Progress stays at the last checkpoint reached.
    pub fn fail(&mut self, message: impl Into<String>) -> PactumResult<()> {
        self.transition(JobStatus::Failed)?;
        let message = message.into();
        self.progress_message = format!("Failed: {}", message);
        self.error = Some(message);
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Snapshot for status polling.
    pub fn status_report(&self) -> JobStatusReport {
        JobStatusReport {
            job_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            progress_message: self.progress_message.clone(),
            error: self.error.clone(),
            processed_at: self.processed_at,
        }
    }
}

/// Status snapshot returned to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

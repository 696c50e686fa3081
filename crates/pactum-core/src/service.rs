//! Contract service: the external operations over jobs.

use std::sync::Arc;

use pactum_extractors::{mime_essence, sniff_mime};

use crate::error::{PactumError, PactumResult};
use crate::events::{JobEvent, JobEventBus, JobEventKind, JobEventSubscriber};
use crate::store::Stores;
use crate::traits::{ContractStore, JobDispatcher, OriginalStore};
use crate::types::{
    ContractJob, JobOutcome, JobPage, JobQuery, JobStatus, JobStatusReport, OriginalDocument,
    SortField, SortOrder, MAX_PAGE_SIZE,
};

/// Content types accepted for upload.
pub const ACCEPTED_TYPES: [&str; 2] = ["application/pdf", "text/plain"];

/// Failure message of jobs found mid-pipeline when the store is reopened.
pub const INTERRUPTED_MESSAGE: &str = "processing was interrupted before completion";

/// Unfinished jobs picked up by [`ContractService::recover`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Pending jobs dispatched again.
    pub requeued: usize,
    /// Processing jobs failed as interrupted.
    pub interrupted: usize,
    /// Retries created for interrupted jobs.
    pub retried: usize,
}

/// Submit, poll, fetch and resubmit contracts.
///
/// The service never changes a job after inserting it; everything past
/// `pending` is written by the orchestrator.
#[derive(Clone)]
pub struct ContractService {
    store: Arc<dyn ContractStore>,
    originals: Arc<dyn OriginalStore>,
    dispatcher: Arc<dyn JobDispatcher>,
    events: JobEventBus,
}

impl ContractService {
    pub fn new(stores: &Stores, dispatcher: Arc<dyn JobDispatcher>, events: JobEventBus) -> Self {
        Self {
            store: Arc::clone(&stores.contracts),
            originals: Arc::clone(&stores.originals),
            dispatcher,
            events,
        }
    }

    /// Resolve the content type of an upload.
    ///
    /// A declared type wins unless it is missing or generic, in which case
    /// the bytes are sniffed. Only [`ACCEPTED_TYPES`] pass.
    pub fn resolve_content_type(bytes: &[u8], declared: Option<&str>) -> PactumResult<String> {
        let declared = declared
            .map(mime_essence)
            .filter(|m| !m.is_empty() && m != "application/octet-stream");
        let resolved = match declared {
            Some(m) => m,
            None => sniff_mime(bytes)
                .map(str::to_string)
                .ok_or_else(|| PactumError::unsupported_type("unknown"))?,
        };
        if !ACCEPTED_TYPES.contains(&resolved.as_str()) {
            return Err(PactumError::unsupported_type(resolved));
        }
        Ok(resolved)
    }

    /// Accept an upload and queue it. Returns the new job id.
    pub async fn submit(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: Option<&str>,
    ) -> PactumResult<String> {
        if bytes.is_empty() {
            return Err(PactumError::empty_upload());
        }
        let content_type = Self::resolve_content_type(&bytes, content_type)?;
        let filename = base_name(filename);

        let job = ContractJob::new(filename.clone(), bytes.len() as u64);
        let original = OriginalDocument {
            bytes,
            filename,
            content_type,
        };
        self.enqueue(job, &original).await
    }

    async fn enqueue(&self, job: ContractJob, original: &OriginalDocument) -> PactumResult<String> {
        self.originals.put_original(job.id(), original).await?;
        self.store.insert_job(&job).await?;
        tracing::info!(
            job_id = job.id(),
            filename = job.filename(),
            bytes = job.file_size_bytes(),
            attempt = job.attempt(),
            "Contract submitted"
        );
        self.events
            .emit(JobEvent::from_job(&job, JobEventKind::Submitted));
        self.dispatcher.dispatch(job.id()).await?;
        Ok(job.id().to_string())
    }

    async fn job(&self, job_id: &str) -> PactumResult<ContractJob> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| PactumError::not_found(job_id))
    }

    /// Current status snapshot.
    pub async fn status(&self, job_id: &str) -> PactumResult<JobStatusReport> {
        Ok(self.job(job_id).await?.status_report())
    }

    /// Consolidated result and gaps of a completed job.
    ///
    /// Pending and processing jobs yield `NotReady`, failed jobs `JobFailed`.
    pub async fn result(&self, job_id: &str) -> PactumResult<JobOutcome> {
        let job = self.job(job_id).await?;
        match job.status() {
            JobStatus::Completed => {
                let record = self.store.get_record(job_id).await?.ok_or_else(|| {
                    PactumError::persistence(format!("record for completed job {} is missing", job_id))
                })?;
                Ok(record.into())
            }
            JobStatus::Failed => Err(PactumError::JobFailed {
                job_id: job_id.to_string(),
                message: job.error().unwrap_or("unknown error").to_string(),
            }),
            status => Err(PactumError::NotReady {
                job_id: job_id.to_string(),
                status,
            }),
        }
    }

    /// The uploaded bytes of a job.
    pub async fn original(&self, job_id: &str) -> PactumResult<OriginalDocument> {
        self.originals
            .get_original(job_id)
            .await?
            .ok_or_else(|| PactumError::not_found(job_id))
    }

    /// Paginated job summaries.
    pub async fn list(&self, query: &JobQuery) -> PactumResult<JobPage> {
        self.store.list_jobs(query).await
    }

    /// Run a job again.
    ///
    /// A failed job is left as it is; a new pending job with the same original
    /// is created and its id returned. A pending job is dispatched again under
    /// its own id. Processing and completed jobs cannot be resubmitted.
    pub async fn resubmit(&self, job_id: &str) -> PactumResult<String> {
        let job = self.job(job_id).await?;
        match job.status() {
            JobStatus::Failed => {
                let original = self.original(job_id).await?;
                let retry = ContractJob::retry_of(&job);
                tracing::info!(job_id, retry_id = retry.id(), "Resubmitting failed contract");
                self.enqueue(retry, &original).await
            }
            JobStatus::Pending => {
                self.dispatcher.dispatch(job_id).await?;
                Ok(job_id.to_string())
            }
            status => Err(PactumError::validation_with_suggestion(
                format!("job {} is {} and cannot be resubmitted", job_id, status),
                "Only failed or pending jobs can be resubmitted",
            )),
        }
    }

    /// Pick up jobs a previous run left unfinished.
    ///
    /// Pending jobs are dispatched again, oldest first. Processing jobs have
    /// no live worker behind them: each is failed with
    /// [`INTERRUPTED_MESSAGE`] and, while its attempt is below
    /// `max_attempts`, resubmitted. Call once, before accepting submissions.
    pub async fn recover(&self, max_attempts: u32) -> PactumResult<Recovery> {
        let mut recovery = Recovery::default();

        let pending = self.job_ids(JobStatus::Pending).await?;
        for job_id in &pending {
            self.dispatcher.dispatch(job_id).await?;
            recovery.requeued += 1;
        }

        for job_id in self.job_ids(JobStatus::Processing).await? {
            let Some(mut job) = self.store.get_job(&job_id).await? else {
                continue;
            };
            if job.status() != JobStatus::Processing {
                continue;
            }
            job.fail(INTERRUPTED_MESSAGE)?;
            self.store.update_job(&job).await?;
            tracing::warn!(job_id = job.id(), progress = job.progress(), "Failed interrupted contract job");
            self.events.emit(JobEvent::from_job(
                &job,
                JobEventKind::Failed {
                    error: INTERRUPTED_MESSAGE.to_string(),
                },
            ));
            recovery.interrupted += 1;

            if job.attempt() < max_attempts {
                let retry_id = self.resubmit(job.id()).await?;
                tracing::info!(job_id = job.id(), retry_id = %retry_id, "Retrying interrupted contract");
                recovery.retried += 1;
            }
        }
        Ok(recovery)
    }

    /// Ids of every job in `status`, oldest first.
    async fn job_ids(&self, status: JobStatus) -> PactumResult<Vec<String>> {
        let mut ids = Vec::new();
        loop {
            let query = JobQuery::default()
                .with_status(status)
                .sorted_by(SortField::UploadedAt, SortOrder::Asc)
                .page(MAX_PAGE_SIZE, ids.len());
            let page = self.store.list_jobs(&query).await?;
            if page.items.is_empty() {
                break;
            }
            ids.extend(page.items.into_iter().map(|summary| summary.id));
            if ids.len() >= page.total {
                break;
            }
        }
        Ok(ids)
    }

    /// Follow job events.
    pub fn subscribe(&self) -> JobEventSubscriber {
        self.events.subscribe()
    }
}

/// The final path component of an uploaded filename.
fn base_name(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if base.is_empty() {
        "contract".to_string()
    } else {
        base.to_string()
    }
}

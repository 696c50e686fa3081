//! Storage traits for jobs, records and uploaded originals.

use async_trait::async_trait;

use crate::error::PactumResult;
use crate::types::{ContractJob, ContractRecord, JobPage, JobQuery, OriginalDocument};

/// Durable home of contract jobs and their records.
///
/// Implementations must keep terminal jobs immutable: once a stored job is
/// completed or failed, every further write to it or its record is refused.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Insert a new pending job.
    async fn insert_job(&self, job: &ContractJob) -> PactumResult<()>;

    /// Fetch the latest snapshot of a job.
    async fn get_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>>;

    /// Atomically move a pending job to processing.
    ///
    /// Returns the claimed job, or `None` when the job is not pending (for
    /// instance because another worker claimed it first).
    async fn claim_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>>;

    /// Write a progress or failure snapshot of a processing job.
    async fn update_job(&self, job: &ContractJob) -> PactumResult<()>;

    /// Atomically persist the record together with the completed job.
    async fn finalize(&self, job: &ContractJob, record: &ContractRecord) -> PactumResult<()>;

    /// Fetch the record of a completed job.
    async fn get_record(&self, job_id: &str) -> PactumResult<Option<ContractRecord>>;

    /// List jobs matching a query.
    async fn list_jobs(&self, query: &JobQuery) -> PactumResult<JobPage>;
}

/// Storage for uploaded bytes.
#[async_trait]
pub trait OriginalStore: Send + Sync {
    /// Store the original upload of a job.
    async fn put_original(&self, job_id: &str, original: &OriginalDocument) -> PactumResult<()>;

    /// Fetch the original upload of a job.
    async fn get_original(&self, job_id: &str) -> PactumResult<Option<OriginalDocument>>;
}

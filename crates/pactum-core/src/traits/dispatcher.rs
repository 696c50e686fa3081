//! Job dispatch trait.

use async_trait::async_trait;

use crate::error::PactumResult;

/// Hands job ids to whatever runs the pipeline.
///
/// Dispatching the same pending job twice is safe: only one worker can
/// claim it.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Queue a job for processing.
    async fn dispatch(&self, job_id: &str) -> PactumResult<()>;
}

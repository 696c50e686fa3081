//! Job orchestrator: runs one job through the extraction pipeline.
//!
//! ```text
//! claim ─▶ ingest ─▶ 25% ─▶ strategies ─▶ 50% ─▶ consolidate + gaps ─▶ 75% ─▶ persist (100%)
//!   │         └──────────────── any error ─▶ failed (progress kept) ───────────────┘
//!   └─ not pending ─▶ skipped
//! ```

use std::sync::Arc;
use std::time::Instant;

use pactum_extractors::IngestPipeline;

use crate::engine::ExtractionEngine;
use crate::error::{PactumError, PactumResult};
use crate::events::{JobEvent, JobEventBus, JobEventKind};
use crate::traits::{ContractStore, OriginalStore};
use crate::types::{Checkpoint, ContractJob, ContractRecord};

/// Sole writer of job state once a job has been submitted.
pub struct JobOrchestrator {
    store: Arc<dyn ContractStore>,
    originals: Arc<dyn OriginalStore>,
    pipeline: Arc<IngestPipeline>,
    engine: Arc<ExtractionEngine>,
    events: JobEventBus,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn ContractStore>,
        originals: Arc<dyn OriginalStore>,
        pipeline: Arc<IngestPipeline>,
        engine: Arc<ExtractionEngine>,
        events: JobEventBus,
    ) -> Self {
        Self {
            store,
            originals,
            pipeline,
            engine,
            events,
        }
    }

    /// Run a job to a terminal state.
    ///
    /// Returns `None` when the job was not pending and another run owns it.
    /// Pipeline errors fail the job and still return it; only a failure to
    /// record that failure is returned as an error.
    pub async fn run(&self, job_id: &str) -> PactumResult<Option<ContractJob>> {
        let Some(mut job) = self.store.claim_job(job_id).await? else {
            tracing::debug!(job_id, "Job is not pending, skipping");
            return Ok(None);
        };

        let started = Instant::now();
        tracing::info!(job_id, filename = job.filename(), attempt = job.attempt(), "Processing contract");
        self.emit(&job, JobEventKind::Progress {
            checkpoint: Checkpoint::Intake,
        });

        match self.process(&mut job).await {
            Ok(()) => {
                tracing::info!(
                    job_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Contract processed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    job_id,
                    code = e.code().as_str(),
                    progress = job.progress(),
                    "Contract processing failed: {}",
                    e
                );
                self.fail(&mut job, &e).await?;
            }
        }
        Ok(Some(job))
    }

    async fn process(&self, job: &mut ContractJob) -> PactumResult<()> {
        let original = self
            .originals
            .get_original(job.id())
            .await?
            .ok_or_else(|| {
                PactumError::persistence(format!("original upload for job {} is missing", job.id()))
            })?;

        let document = self
            .pipeline
            .ingest_auto(&original.bytes, Some(&original.content_type))
            .await?;
        drop(original);
        self.advance(job, Checkpoint::Ingested).await?;

        let run = self.engine.run_strategies(Arc::new(document)).await;
        self.advance(job, Checkpoint::StrategiesComplete).await?;

        let result = self.engine.consolidate(&run);
        let gaps = self.engine.analyze_gaps(&result);
        self.advance(job, Checkpoint::Analyzed).await?;

        let record = ContractRecord::new(job, result, gaps);
        let mut completed = job.clone();
        completed.complete()?;
        self.store.finalize(&completed, &record).await?;
        *job = completed;

        self.emit(job, JobEventKind::Completed {
            gaps: record.gaps.len(),
        });
        Ok(())
    }

    /// Record a checkpoint. The local job only moves once the store has it.
    async fn advance(&self, job: &mut ContractJob, checkpoint: Checkpoint) -> PactumResult<()> {
        let mut next = job.clone();
        next.checkpoint(checkpoint)?;
        self.store.update_job(&next).await?;
        *job = next;

        tracing::debug!(job_id = job.id(), progress = job.progress(), "{}", checkpoint.message());
        self.emit(job, JobEventKind::Progress { checkpoint });
        Ok(())
    }

    async fn fail(&self, job: &mut ContractJob, error: &PactumError) -> PactumResult<()> {
        let message = error.job_message();
        job.fail(message.clone())?;
        self.store.update_job(job).await.map_err(|e| {
            tracing::error!(job_id = job.id(), "Could not record job failure: {}", e);
            e
        })?;
        self.emit(job, JobEventKind::Failed { error: message });
        Ok(())
    }

    fn emit(&self, job: &ContractJob, kind: JobEventKind) {
        self.events.emit(JobEvent::from_job(job, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::consolidation::Consolidator;
    use crate::gaps::GapAnalyzer;
    use crate::store::Stores;
    use crate::strategies::PatternStrategy;
    use crate::traits::ExtractionStrategy;
    use crate::types::{ContractField, JobStatus, OriginalDocument};

    fn orchestrator(stores: &Stores, events: JobEventBus) -> JobOrchestrator {
        let engine = ExtractionEngine::new(
            vec![Arc::new(PatternStrategy::new()) as Arc<dyn ExtractionStrategy>],
            Consolidator::default(),
            GapAnalyzer::default(),
            Duration::from_secs(5),
        );
        JobOrchestrator::new(
            stores.contracts.clone(),
            stores.originals.clone(),
            Arc::new(IngestPipeline::with_defaults()),
            Arc::new(engine),
            events,
        )
    }

    async fn submit(stores: &Stores, bytes: &[u8], content_type: &str) -> String {
        let job = ContractJob::new("contract.txt", bytes.len() as u64);
        stores
            .originals
            .put_original(
                job.id(),
                &OriginalDocument {
                    bytes: bytes.to_vec(),
                    filename: "contract.txt".to_string(),
                    content_type: content_type.to_string(),
                },
            )
            .await
            .unwrap();
        stores.contracts.insert_job(&job).await.unwrap();
        job.id().to_string()
    }

    #[tokio::test]
    async fn test_completed_run_persists_record() {
        let stores = Stores::in_memory();
        let events = JobEventBus::new();
        let mut subscriber = events.subscribe();
        let job_id = submit(&stores, b"Payment is due Net 30.", "text/plain").await;

        let job = orchestrator(&stores, events).run(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.progress(), 100);

        let record = stores.contracts.get_record(&job_id).await.unwrap().unwrap();
        assert!(record.result.contains(ContractField::PaymentTerms));
        assert!(record.gaps.contains(ContractField::CustomerName));

        let mut progress = Vec::new();
        while let Some(event) = subscriber.try_recv() {
            progress.push(event.progress);
        }
        assert_eq!(progress, vec![0, 25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_ingest_failure_fails_job_at_intake() {
        let stores = Stores::in_memory();
        let job_id = submit(&stores, b"   \n", "text/plain").await;

        let job = orchestrator(&stores, JobEventBus::new())
            .run(&job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.progress(), 0);
        assert!(job.error().unwrap().starts_with("Document could not be processed"));
        assert!(stores.contracts.get_record(&job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_run_is_skipped() {
        let stores = Stores::in_memory();
        let job_id = submit(&stores, b"Net 30", "text/plain").await;
        let orchestrator = orchestrator(&stores, JobEventBus::new());

        assert!(orchestrator.run(&job_id).await.unwrap().is_some());
        assert!(orchestrator.run(&job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_original_fails_job() {
        let stores = Stores::in_memory();
        let job = ContractJob::new("lost.pdf", 10);
        stores.contracts.insert_job(&job).await.unwrap();

        let job = orchestrator(&stores, JobEventBus::new())
            .run(job.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
    }
}

//! Dispatch queue and worker pool.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::error::{PactumError, PactumResult};
use crate::orchestrator::JobOrchestrator;
use crate::service::ContractService;
use crate::traits::JobDispatcher;
use crate::types::{ContractJob, JobStatus};

/// Dispatcher backed by a bounded in-process queue.
#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<String>,
}

/// Receiving end of a [`ChannelDispatcher`], consumed by a [`WorkerPool`].
pub struct JobReceiver {
    receiver: mpsc::Receiver<String>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver its jobs arrive on.
    pub fn channel(capacity: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, JobReceiver { receiver })
    }
}

#[async_trait]
impl JobDispatcher for ChannelDispatcher {
    async fn dispatch(&self, job_id: &str) -> PactumResult<()> {
        self.sender
            .send(job_id.to_string())
            .await
            .map_err(|_| PactumError::Internal("dispatch queue is closed".to_string()))
    }
}

/// Fixed set of tokio tasks, each running one job at a time.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Start `worker_count` workers on `receiver`.
    ///
    /// Failed jobs are resubmitted through `service` while their attempt is
    /// below `max_attempts`.
    pub fn start(
        receiver: JobReceiver,
        orchestrator: Arc<JobOrchestrator>,
        service: ContractService,
        config: &WorkerConfig,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver.receiver));
        let (shutdown, signal) = watch::channel(false);
        let worker_count = config.worker_count.max(1);

        let handles = (0..worker_count)
            .map(|worker| {
                let worker = Worker {
                    id: worker,
                    receiver: Arc::clone(&receiver),
                    orchestrator: Arc::clone(&orchestrator),
                    service: service.clone(),
                    max_attempts: config.max_attempts,
                    shutdown: signal.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!(workers = worker_count, "Worker pool started");
        Self { handles, shutdown }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop taking new jobs and wait for running ones to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    orchestrator: Arc<JobOrchestrator>,
    service: ContractService,
    max_attempts: u32,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn next_job(&mut self) -> Option<String> {
        if *self.shutdown.borrow() {
            return None;
        }
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            _ = self.shutdown.changed() => None,
            job_id = receiver.recv() => job_id,
        }
    }

    /// Resubmit a failed job from its own task.
    ///
    /// Dispatch waits while the queue is full, and only workers drain it.
    /// The retry job is stored as pending before dispatch, so a restart
    /// recovers it even if the dispatch never lands.
    fn schedule_retry(&self, job: ContractJob) {
        let service = self.service.clone();
        tokio::spawn(async move {
            match service.resubmit(job.id()).await {
                Ok(retry_id) => tracing::info!(
                    job_id = job.id(),
                    retry_id = %retry_id,
                    attempt = job.attempt() + 1,
                    "Retrying failed contract"
                ),
                Err(e) => tracing::error!(job_id = job.id(), "Automatic retry failed: {}", e),
            }
        });
    }

    async fn run(mut self) {
        tracing::debug!(worker = self.id, "Worker started");
        while let Some(job_id) = self.next_job().await {
            match self.orchestrator.run(&job_id).await {
                Ok(Some(job)) if job.status() == JobStatus::Failed => {
                    if job.attempt() < self.max_attempts {
                        self.schedule_retry(job);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(worker = self.id, job_id = %job_id, "Job run aborted: {}", e)
                }
            }
        }
        tracing::debug!(worker = self.id, "Worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pactum_extractors::IngestPipeline;

    use crate::consolidation::Consolidator;
    use crate::engine::ExtractionEngine;
    use crate::events::JobEventBus;
    use crate::gaps::GapAnalyzer;
    use crate::store::Stores;
    use crate::strategies::PatternStrategy;
    use crate::traits::ExtractionStrategy;
    use crate::types::JobQuery;

    struct Harness {
        service: ContractService,
        stores: Stores,
        events: JobEventBus,
        pool: WorkerPool,
    }

    fn harness(config: WorkerConfig) -> Harness {
        let stores = Stores::in_memory();
        let events = JobEventBus::new();
        let (dispatcher, receiver) = ChannelDispatcher::channel(config.queue_capacity);
        let service = ContractService::new(&stores, Arc::new(dispatcher), events.clone());
        let engine = ExtractionEngine::new(
            vec![Arc::new(PatternStrategy::new()) as Arc<dyn ExtractionStrategy>],
            Consolidator::default(),
            GapAnalyzer::default(),
            Duration::from_secs(5),
        );
        let orchestrator = Arc::new(JobOrchestrator::new(
            stores.contracts.clone(),
            stores.originals.clone(),
            Arc::new(IngestPipeline::with_defaults()),
            Arc::new(engine),
            events.clone(),
        ));
        let pool = WorkerPool::start(receiver, orchestrator, service.clone(), &config);
        Harness {
            service,
            stores,
            events,
            pool,
        }
    }

    #[tokio::test]
    async fn test_pool_processes_submissions() {
        let h = harness(WorkerConfig {
            worker_count: 3,
            ..Default::default()
        });
        let mut events = h.events.subscribe();

        let mut ids = Vec::new();
        for i in 0..5 {
            let text = format!("Contract {}. Payment is due Net {}.", i, 30 + i);
            ids.push(h.service.submit(text.into_bytes(), "c.txt", None).await.unwrap());
        }

        let mut finished = 0;
        while finished < ids.len() {
            let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
                .await
                .unwrap()
                .unwrap();
            if event.is_terminal() {
                finished += 1;
            }
        }

        for id in &ids {
            assert_eq!(h.service.status(id).await.unwrap().status, JobStatus::Completed);
        }
        h.pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_job_retried_up_to_max_attempts() {
        let h = harness(WorkerConfig {
            worker_count: 1,
            max_attempts: 2,
            ..Default::default()
        });
        let mut events = h.events.subscribe();

        // valid UTF-8 header but no text once trimmed
        let first = h.service.submit(b"   ".to_vec(), "blank.txt", Some("text/plain")).await.unwrap();

        let mut failures = Vec::new();
        while failures.len() < 2 {
            let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
                .await
                .unwrap()
                .unwrap();
            if event.status == JobStatus::Failed {
                failures.push(event.job_id);
            }
        }

        assert_eq!(failures[0], first);
        let retry = h.stores.contracts.get_job(&failures[1]).await.unwrap().unwrap();
        assert_eq!(retry.attempt(), 2);
        assert_eq!(retry.retry_of_id(), Some(first.as_str()));

        // no third attempt
        tokio::time::sleep(Duration::from_millis(100)).await;
        let page = h.stores.contracts.list_jobs(&Default::default()).await.unwrap();
        assert_eq!(page.total, 2);
        h.pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_retries_do_not_stall_a_full_queue() {
        let h = harness(WorkerConfig {
            worker_count: 1,
            queue_capacity: 1,
            max_attempts: 2,
        });
        let mut events = h.events.subscribe();

        let failures = tokio::time::timeout(Duration::from_secs(10), async {
            for i in 0..4 {
                h.service
                    .submit(b" \n ".to_vec(), &format!("blank-{}.txt", i), Some("text/plain"))
                    .await
                    .unwrap();
            }
            let mut failures = 0;
            while failures < 8 {
                let event = events.recv().await.unwrap();
                if event.status == JobStatus::Failed {
                    failures += 1;
                }
            }
            failures
        })
        .await
        .expect("worker pool stalled");
        assert_eq!(failures, 8);

        let page = h
            .stores
            .contracts
            .list_jobs(&JobQuery::default().with_status(JobStatus::Failed))
            .await
            .unwrap();
        assert_eq!(page.total, 8);
        h.pool.shutdown().await;
    }
}

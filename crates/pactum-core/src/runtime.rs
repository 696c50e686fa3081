//! Background runtime wiring stores, engine, orchestrator and workers.
//!
//! Manages the lifecycle of the [`WorkerPool`], providing unified startup
//! and graceful shutdown. Startup also picks up jobs a previous process left
//! unfinished in a durable store.

use std::sync::Arc;

use pactum_extractors::IngestPipeline;
use tracing::{debug, info, warn};

use crate::config::PactumConfig;
use crate::engine::ExtractionEngine;
use crate::error::PactumResult;
use crate::events::JobEventBus;
use crate::models::ModelRegistry;
use crate::orchestrator::JobOrchestrator;
use crate::service::{ContractService, Recovery};
use crate::store::Stores;
use crate::strategies::default_strategies;
use crate::traits::ExtractionStrategy;
use crate::worker::{ChannelDispatcher, WorkerPool};

/// A running pactum instance.
///
/// # Example
///
/// ```ignore
/// use pactum_core::{PactumConfig, PactumRuntime};
///
/// let runtime = PactumRuntime::start(PactumConfig::from_env(), models).await?;
/// let job_id = runtime.service().submit(bytes, "msa.pdf", None).await?;
/// // ...
/// runtime.shutdown().await;
/// ```
pub struct PactumRuntime {
    service: ContractService,
    stores: Stores,
    events: JobEventBus,
    engine: Arc<ExtractionEngine>,
    pool: WorkerPool,
}

impl PactumRuntime {
    /// Open the configured store and start the workers with the standard strategies.
    pub async fn start(config: PactumConfig, models: ModelRegistry) -> PactumResult<Self> {
        config.validate()?;
        let stores = Stores::open(&config.store)?;
        let strategies = default_strategies(&config.extraction, &models);
        Self::with_strategies(config, stores, strategies).await
    }

    /// Start the workers over explicit stores and strategies, then recover
    /// the jobs left pending or processing in `stores`.
    pub async fn with_strategies(
        config: PactumConfig,
        stores: Stores,
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
    ) -> PactumResult<Self> {
        let events = JobEventBus::new();
        let engine = Arc::new(ExtractionEngine::from_config(strategies, &config.extraction));
        debug!(strategies = ?engine.strategy_kinds(), "Extraction engine ready");

        let (dispatcher, receiver) = ChannelDispatcher::channel(config.worker.queue_capacity);
        let service = ContractService::new(&stores, Arc::new(dispatcher), events.clone());
        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&stores.contracts),
            Arc::clone(&stores.originals),
            Arc::new(IngestPipeline::with_defaults()),
            Arc::clone(&engine),
            events.clone(),
        ));
        let pool = WorkerPool::start(receiver, orchestrator, service.clone(), &config.worker);

        // Workers are already draining the queue, so requeueing cannot stall.
        let recovery = match service.recover(config.worker.max_attempts).await {
            Ok(recovery) => recovery,
            Err(e) => {
                pool.shutdown().await;
                return Err(e);
            }
        };
        if recovery != Recovery::default() {
            warn!(
                requeued = recovery.requeued,
                interrupted = recovery.interrupted,
                retried = recovery.retried,
                "Recovered unfinished contract jobs"
            );
        }

        info!(workers = pool.worker_count(), "Pactum runtime started");
        Ok(Self {
            service,
            stores,
            events,
            engine,
            pool,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    pub fn service(&self) -> &ContractService {
        &self.service
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn events(&self) -> &JobEventBus {
        &self.events
    }

    pub fn engine(&self) -> &Arc<ExtractionEngine> {
        &self.engine
    }

    /// Stop the workers, letting in-flight jobs finish.
    pub async fn shutdown(self) {
        debug!("Shutting down pactum runtime");
        self.pool.shutdown().await;
        info!("Pactum runtime stopped");
    }
}

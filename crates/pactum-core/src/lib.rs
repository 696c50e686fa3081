//! pactum-core - Core library for pactum.
//!
//! This crate provides the extraction strategies, the consolidator and gap
//! analyzer, and the contract job lifecycle (stores, orchestrator, workers)
//! behind the pactum contract-analysis service.
//!
//! # Example
//!
//! ```ignore
//! use pactum_core::{PactumConfig, PactumRuntime};
//!
//! let runtime = PactumRuntime::start(PactumConfig::from_env(), models)?;
//!
//! // Submit a contract and poll it
//! let job_id = runtime.service().submit(bytes, "msa.pdf", Some("application/pdf")).await?;
//! let status = runtime.service().status(&job_id).await?;
//!
//! // Once completed
//! let outcome = runtime.service().result(&job_id).await?;
//! for gap in outcome.gaps.fields() {
//!     println!("missing: {}", gap);
//! }
//! ```

pub mod config;
pub mod consolidation;
pub mod engine;
pub mod error;
pub mod events;
pub mod gaps;
pub mod models;
pub mod orchestrator;
pub mod runtime;
pub mod service;
pub mod store;
pub mod strategies;
pub mod traits;
pub mod types;
pub mod worker;

pub use pactum_extractors;

// Re-export commonly used types
pub use config::PactumConfig;
pub use consolidation::Consolidator;
pub use engine::{ExtractionEngine, StrategyOutcome, StrategyRun};
pub use error::{ErrorCode, PactumError, PactumResult};
pub use events::{JobEvent, JobEventBus, JobEventKind, JobEventSubscriber};
pub use gaps::GapAnalyzer;
pub use models::{ModelRegistry, SharedModel};
pub use orchestrator::JobOrchestrator;
pub use runtime::PactumRuntime;
pub use service::{ContractService, Recovery, INTERRUPTED_MESSAGE};
pub use store::{InMemoryContractStore, SqliteContractStore, Stores};
pub use traits::{
    ContractStore, Embedder, Entity, EntityLabel, EntityRecognizer, ExtractionStrategy,
    JobDispatcher, OriginalStore,
};
pub use types::{
    ContractField, ContractJob, ContractRecord, ExtractedField, ExtractionResult, FieldValue,
    GapList, JobOutcome, JobPage, JobQuery, JobStatus, JobStatusReport, OriginalDocument,
    RenewalCategory, StrategyKind,
};
pub use worker::{ChannelDispatcher, JobReceiver, WorkerPool};

//! Job, record and original storage backends.

mod memory;
mod sqlite;

pub use memory::InMemoryContractStore;
pub use sqlite::SqliteContractStore;

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{PactumError, PactumResult};
use crate::traits::{ContractStore, OriginalStore};
use crate::types::{ContractJob, ContractRecord, JobStatus};

/// The configured store, behind both storage traits.
#[derive(Clone)]
pub struct Stores {
    pub contracts: Arc<dyn ContractStore>,
    pub originals: Arc<dyn OriginalStore>,
}

impl Stores {
    /// Open the backend named in the configuration.
    pub fn open(config: &StoreConfig) -> PactumResult<Self> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::Sqlite => {
                let store = Arc::new(SqliteContractStore::open(&config.sqlite_path)?);
                tracing::info!(path = %config.sqlite_path.display(), "Opened SQLite contract store");
                Ok(Self {
                    contracts: store.clone(),
                    originals: store,
                })
            }
        }
    }

    /// A fresh in-memory store.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryContractStore::new());
        Self {
            contracts: store.clone(),
            originals: store,
        }
    }
}

/// Validate a progress or failure write against the stored snapshot.
///
/// Only processing jobs accept writes; completion must go through
/// `finalize`; progress never decreases.
pub(crate) fn check_update(stored: &ContractJob, incoming: &ContractJob) -> PactumResult<()> {
    let allowed = stored.status() == JobStatus::Processing
        && matches!(incoming.status(), JobStatus::Processing | JobStatus::Failed);
    if !allowed {
        return Err(PactumError::InvalidTransition {
            job_id: stored.id().to_string(),
            from: stored.status(),
            to: incoming.status(),
        });
    }
    if incoming.progress() < stored.progress() {
        return Err(PactumError::validation(format!(
            "progress for job {} cannot move from {} back to {}",
            stored.id(),
            stored.progress(),
            incoming.progress()
        )));
    }
    Ok(())
}

/// Validate the final write of a completed job and its record.
pub(crate) fn check_finalize(
    stored: &ContractJob,
    incoming: &ContractJob,
    record: &ContractRecord,
) -> PactumResult<()> {
    if stored.status() != JobStatus::Processing || incoming.status() != JobStatus::Completed {
        return Err(PactumError::InvalidTransition {
            job_id: stored.id().to_string(),
            from: stored.status(),
            to: incoming.status(),
        });
    }
    if record.job_id != incoming.id() {
        return Err(PactumError::persistence(format!(
            "record for job {} cannot be stored under job {}",
            record.job_id,
            incoming.id()
        )));
    }
    Ok(())
}

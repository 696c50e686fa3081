//! Server state management.

use std::sync::Arc;

use pactum_core::{ContractService, PactumRuntime};
use tokio::sync::Mutex;

/// Largest accepted upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: ContractService,
    pub max_upload_bytes: usize,
    runtime: Arc<Mutex<Option<PactumRuntime>>>,
}

impl AppState {
    /// Create state around a running runtime.
    pub fn new(runtime: PactumRuntime) -> Self {
        Self {
            service: runtime.service().clone(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            runtime: Arc::new(Mutex::new(Some(runtime))),
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Workers currently running, or `None` once the runtime was taken for shutdown.
    pub async fn worker_count(&self) -> Option<usize> {
        self.runtime.lock().await.as_ref().map(PactumRuntime::worker_count)
    }

    /// Take the runtime for shutdown. Later calls return `None`.
    pub async fn take_runtime(&self) -> Option<PactumRuntime> {
        self.runtime.lock().await.take()
    }
}

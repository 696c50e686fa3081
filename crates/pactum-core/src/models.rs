//! Lazily initialised, read-only shared models.
//!
//! Heavy models (entity recognisers, sentence embedders) are loaded at most
//! once per process, on first use, and then shared across every job and
//! worker. Access goes through an explicit [`SharedModel`] handle rather than
//! a global, so tests can substitute fakes with [`SharedModel::ready`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::{PactumError, PactumResult};
use crate::traits::{Embedder, EntityRecognizer};

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, PactumResult<Arc<T>>> + Send + Sync>;

/// A model loaded on first access and never mutated afterwards.
///
/// Concurrent first accesses run the loader once; the others wait for it.
/// A failed load is not cached, so the next access retries.
pub struct SharedModel<T: ?Sized + Send + Sync + 'static> {
    name: String,
    cell: OnceCell<Arc<T>>,
    loader: Loader<T>,
}

impl<T: ?Sized + Send + Sync + 'static> SharedModel<T> {
    /// Create a handle that loads the model with `loader` on first use.
    pub fn new<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PactumResult<Arc<T>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            cell: OnceCell::new(),
            loader: Box::new(move || Box::pin(loader())),
        }
    }

    /// Create a handle around an already-loaded model.
    pub fn ready(name: impl Into<String>, model: Arc<T>) -> Self {
        let name = name.into();
        let loader_name = name.clone();
        Self {
            name,
            cell: OnceCell::from(model),
            loader: Box::new(move || {
                let name = loader_name.clone();
                Box::pin(async move {
                    Err(PactumError::model_load(format!("model '{}' has no loader", name)))
                })
            }),
        }
    }

    /// Get the model, loading it if needed.
    pub async fn get(&self) -> PactumResult<Arc<T>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                let started = Instant::now();
                tracing::info!(model = %self.name, "Loading shared model");
                let model = (self.loader)().await?;
                tracing::info!(
                    model = %self.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Shared model loaded"
                );
                Ok::<_, PactumError>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for SharedModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedModel")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// The models shared by all extraction strategies.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    recognizer: Arc<SharedModel<dyn EntityRecognizer>>,
    embedder: Arc<SharedModel<dyn Embedder>>,
}

impl ModelRegistry {
    pub fn new(
        recognizer: SharedModel<dyn EntityRecognizer>,
        embedder: SharedModel<dyn Embedder>,
    ) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
            embedder: Arc::new(embedder),
        }
    }

    /// Registry around already-constructed models.
    pub fn from_models(
        recognizer: Arc<dyn EntityRecognizer>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let recognizer_name = recognizer.model_name().to_string();
        let embedder_name = embedder.model_name().to_string();
        Self::new(
            SharedModel::ready(recognizer_name, recognizer),
            SharedModel::ready(embedder_name, embedder),
        )
    }

    pub fn recognizer(&self) -> &Arc<SharedModel<dyn EntityRecognizer>> {
        &self.recognizer
    }

    pub fn embedder(&self) -> &Arc<SharedModel<dyn Embedder>> {
        &self.embedder
    }

    /// Load every model now instead of on the first job.
    pub async fn warm_up(&self) -> PactumResult<()> {
        self.recognizer.get().await?;
        self.embedder.get().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_loader_runs_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model: Arc<SharedModel<String>> = Arc::new(SharedModel::new("greeting", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("hello".to_string()))
            }
        }));

        assert!(!model.is_loaded());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                tokio::spawn(async move { model.get().await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().as_str(), "hello");
        }

        assert!(model.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let model: SharedModel<String> = SharedModel::new("flaky", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(PactumError::model_load("first load fails"))
                } else {
                    Ok(Arc::new("loaded".to_string()))
                }
            }
        });

        assert!(model.get().await.is_err());
        assert!(!model.is_loaded());
        assert_eq!(model.get().await.unwrap().as_str(), "loaded");
    }

    #[tokio::test]
    async fn test_ready_model_is_loaded() {
        let model = SharedModel::ready("fixed", Arc::new(42u32));
        assert!(model.is_loaded());
        assert_eq!(*model.get().await.unwrap(), 42);
    }
}

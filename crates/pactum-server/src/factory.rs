//! Factory for creating the runtime from configuration.

use pactum_core::config::PactumConfig;
use pactum_core::error::PactumResult;
use pactum_core::PactumRuntime;
use pactum_models::ModelFactory;

/// Load configuration from `PACTUM_CONFIG` if set, then apply `PACTUM_*` overrides.
pub fn load_config() -> PactumResult<PactumConfig> {
    let config = match std::env::var("PACTUM_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading configuration file");
            PactumConfig::from_file(&path)?
        }
        Err(_) => PactumConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Create the models and start the runtime.
pub async fn create_runtime(config: PactumConfig) -> PactumResult<PactumRuntime> {
    let models = ModelFactory::registry(&config.models)?;
    if let Err(e) = models.warm_up().await {
        // models load lazily, so the first job retries
        tracing::warn!("Model warm-up failed: {}", e);
    }
    PactumRuntime::start(config, models).await
}

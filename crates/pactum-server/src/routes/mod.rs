//! Route definitions for the REST API.

mod contracts;
mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Contract jobs
        .route(
            "/contracts",
            post(contracts::submit_contract).get(contracts::list_contracts),
        )
        .route("/contracts/:id", get(contracts::get_contract))
        .route("/contracts/:id/status", get(contracts::get_status))
        .route("/contracts/:id/download", get(contracts::download_original))
        .route("/contracts/:id/retry", post(contracts::retry_contract))
        // Attach state
        .with_state(state)
}

pub use contracts::*;
pub use health::*;

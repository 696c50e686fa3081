//! pactum-server - REST API server for pactum.
//!
//! This crate exposes contract submission, status polling, results and
//! original downloads over HTTP.
//!
//! # Example
//!
//! ```ignore
//! use pactum_server::{create_runtime, create_server, load_config, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = create_runtime(load_config().unwrap()).await.unwrap();
//!     let app = create_server(AppState::new(runtime));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::{create_runtime, load_config};
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Multipart framing allowance on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;
    routes::create_router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}

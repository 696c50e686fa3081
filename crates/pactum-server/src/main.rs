//! pactum-server - REST API server binary.

use std::net::SocketAddr;

use pactum_server::{create_runtime, create_server, load_config, AppState};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("pactum_server=debug".parse()?);

    // PACTUM_LOG_FORMAT=json switches to structured output
    let json = std::env::var("PACTUM_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing()?;

    // Get configuration from environment
    let host = std::env::var("PACTUM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PACTUM_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("PACTUM_PORT must be a valid port number: {}", e))?;

    let config = load_config()?;
    info!(
        store = ?config.store.backend,
        workers = config.worker.worker_count,
        embedder = ?config.models.embedder,
        "Configuration loaded"
    );

    let runtime = create_runtime(config).await?;
    let mut state = AppState::new(runtime);
    if let Some(limit) = std::env::var("PACTUM_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        state = state.with_max_upload_bytes(limit);
    }
    let app = create_server(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting pactum-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining workers...");
        })
        .await?;

    // In-flight jobs finish before exit
    if let Some(runtime) = state.take_runtime().await {
        runtime.shutdown().await;
    }

    info!("Server stopped cleanly");
    Ok(())
}

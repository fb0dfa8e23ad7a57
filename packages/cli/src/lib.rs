// ABOUTME: Server bootstrap for Buildbox
// ABOUTME: Initializes logging, connects to Docker and serves the HTTP API

use axum::http::{HeaderValue, Method};
use buildbox_api::{create_router, AppState};
use buildbox_config::constants::RUST_LOG;
use buildbox_sandbox::{CompileService, ContainerRuntime, DockerRuntime};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;

use config::Config;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(RUST_LOG).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = DockerRuntime::new()?;
    match runtime.ping().await {
        Ok(()) => info!("Connected to Docker"),
        Err(e) => warn!(error = %e, "Docker is not reachable; builds will fail until it is"),
    }

    let service = CompileService::new(Arc::new(runtime), &config.service);
    let state = AppState::new(service, config.defaults);

    let mut app = create_router(state).layer(TraceLayer::new_for_http());

    if let Some(origin) = &config.cors_origin {
        let cors = CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr = config.socket_addr();
    info!(
        %addr,
        cors_origin = config.cors_origin.as_deref().unwrap_or("disabled"),
        timeout_ms = config.defaults.timeout_ms,
        "Buildbox server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

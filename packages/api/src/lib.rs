// ABOUTME: HTTP API layer for Buildbox
// ABOUTME: Routes compile, defaults configuration and health requests onto the compile service

use axum::{
    routing::{get, post},
    Router,
};

pub mod compile_handlers;
pub mod config_handlers;
pub mod error;
pub mod health;
pub mod state;

pub use error::{ApiResult, AppError};
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/compile", post(compile_handlers::compile))
        .route(
            "/api/config",
            get(config_handlers::get_config).put(config_handlers::update_config),
        )
        .with_state(state)
}

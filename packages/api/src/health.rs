// ABOUTME: Health check endpoint
// ABOUTME: Reports service status along with Docker daemon reachability

use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let docker = match state.service.runtime().ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Docker ping failed");
            "unavailable"
        }
    };

    Json(json!({
        "status": if docker == "connected" { "healthy" } else { "degraded" },
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "service": "buildbox",
        "docker": docker
    }))
}

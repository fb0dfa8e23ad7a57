// ABOUTME: HTTP handlers for reading and updating the build defaults
// ABOUTME: Partial updates are validated as a whole before being applied

use crate::error::{ApiResult, AppError};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use buildbox_sandbox::policy::update_defaults;
use buildbox_sandbox::{BuildDefaults, LimitOverrides};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Wire form of the process-wide build defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsView {
    pub memory: i64,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub timeout_ms: u64,
}

impl From<BuildDefaults> for DefaultsView {
    fn from(defaults: BuildDefaults) -> Self {
        Self {
            memory: defaults.limits.memory_bytes,
            cpu_period: defaults.limits.cpu_period_us,
            cpu_quota: defaults.limits.cpu_quota_us,
            timeout_ms: defaults.timeout_ms,
        }
    }
}

pub async fn get_config(State(state): State<AppState>) -> Json<DefaultsView> {
    Json(state.defaults_snapshot().await.into())
}

/// Apply a partial update. Requests already running keep their snapshot.
pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<LimitOverrides>, JsonRejection>,
) -> ApiResult<Json<DefaultsView>> {
    let Json(update) = payload.map_err(|e| AppError::invalid_body(e.body_text()))?;

    let mut defaults = state.defaults.write().await;
    let next = update_defaults(&defaults, &update)?;
    *defaults = next;

    info!(
        memory = next.limits.memory_bytes,
        cpu_period = next.limits.cpu_period_us,
        cpu_quota = next.limits.cpu_quota_us,
        timeout_ms = next.timeout_ms,
        "Updated build defaults"
    );

    Ok(Json(next.into()))
}

// ABOUTME: HTTP handler for POST /api/compile
// ABOUTME: Runs a compile request and maps its outcome to a status code and JSON body

use crate::error::{ApiResult, AppError};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use buildbox_sandbox::{ArtifactSet, BuildOutcome, CompileRequest, ErrorKind, Framework};
use serde::Serialize;
use tracing::error;

pub const INTERNAL_BUILD_MESSAGE: &str = "The build sandbox could not be run";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileSuccess {
    pub success: bool,
    pub framework: Framework,
    pub files: ArtifactSet,
    pub compilation_time_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileFailure {
    pub success: bool,
    pub error_kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BuildFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Compile one component in a fresh sandbox
pub async fn compile(
    State(state): State<AppState>,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| AppError::invalid_body(e.body_text()))?;
    let defaults = state.defaults_snapshot().await;
    let result = state.service.compile(request, defaults).await?;

    let response = match result.outcome {
        BuildOutcome::Success { files, duration_ms } => (
            StatusCode::OK,
            Json(CompileSuccess {
                success: true,
                framework: result.framework,
                files,
                compilation_time_ms: duration_ms,
            }),
        )
            .into_response(),
        BuildOutcome::Failure {
            error_kind,
            message,
            transcript,
        } => {
            let message = if error_kind == ErrorKind::InternalError {
                error!(framework = %result.framework, error = %message, "Compile request hit an internal error");
                INTERNAL_BUILD_MESSAGE.to_string()
            } else {
                message
            };
            (
                status_for(error_kind),
                Json(CompileFailure {
                    success: false,
                    error_kind,
                    message,
                    transcript,
                }),
            )
                .into_response()
        }
    };

    Ok(response)
}

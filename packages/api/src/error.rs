// ABOUTME: Error envelope returned by the HTTP API
// ABOUTME: Maps request validation failures to status codes and structured JSON bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use buildbox_sandbox::ValidationError;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Error type returned by every handler
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Body missing, not JSON, or of the wrong shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Structured error response format for API consistency
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
}

impl AppError {
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST_BODY"),
        }
    }

    /// Message safe to show to callers
    fn to_user_message(&self) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::InvalidBody(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<HashMap<String, String>> {
        match self {
            AppError::Validation(err) => {
                Some(HashMap::from([("field".to_string(), err.field().to_string())]))
            }
            AppError::InvalidBody(_) => None,
        }
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();

        info!(
            request_id = %request_id,
            error_code = %error_code,
            error = %self,
            "API error response"
        );

        let error_response = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.to_user_message(),
                details: self.details(),
            },
            request_id,
        };

        (status_code, Json(error_response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;

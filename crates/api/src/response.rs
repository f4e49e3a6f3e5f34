//! API response bodies and error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::{ComponentHealthReport, MetricsSnapshot};

/// Response for a synthesized session burst.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub status: String,
    pub session_id: String,
    pub is_automated: bool,
    pub record_count: usize,
    pub source_address: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub producer_connected: bool,
    pub components: Vec<ComponentHealthReport>,
    pub metrics: MetricsSnapshot,
}

/// Error body: `{ "error": ..., "code": ... }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse {
                error: msg.into(),
                code: code.into(),
            },
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<stream_core::Error> for ApiError {
    fn from(err: stream_core::Error) -> Self {
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err.error_code() {
            Some(code) => ApiError::with_code(status, code, err.to_string()),
            None => ApiError::with_code(status, "INTERNAL", err.to_string()),
        }
    }
}

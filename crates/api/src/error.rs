//! JSON error responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use cashdesk_core::ledger::{ErrorClass, LedgerError};

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Ledger failure; status and code come from the error itself.
    Ledger(LedgerError),
    /// Caller identity headers missing or malformed.
    Unauthorized(String),
    /// Request could not be interpreted.
    BadRequest(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Ledger(err) => (
                StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.error_code(),
                err.to_string(),
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if let Self::Ledger(err) = &self {
            match err.class() {
                ErrorClass::PartialFailure | ErrorClass::Storage => {
                    tracing::error!(error = %err, code, "Request failed");
                }
                ErrorClass::Consistency => tracing::warn!(error = %err, code, "Request failed, retryable"),
                _ => tracing::debug!(error = %err, code, "Request rejected"),
            }
        }
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

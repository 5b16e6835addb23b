//! API error type with IntoResponse.
//!
//! Client rejections, transient exhaustion, and server failures map to
//! distinct status codes so callers can tell "fix your request" from
//! "retry later" from "not your fault". 5xx detail is logged, never
//! returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use sqlgate_core::error::ExecuteError;

#[derive(Debug)]
pub enum ApiError {
    /// Failure from the execution pipeline
    Execute(ExecuteError),

    /// Authentication rejection (403)
    Forbidden { reason: String },
}

impl ApiError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}

impl From<ExecuteError> for ApiError {
    fn from(err: ExecuteError) -> Self {
        Self::Execute(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Forbidden { reason } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "forbidden",
                    "message": reason
                }),
            ),
            Self::Execute(err) => match &err {
                ExecuteError::UnknownQueryCode { code } => (
                    StatusCode::NOT_FOUND,
                    json!({
                        "error": "unknown_query_code",
                        "message": format!("query code '{}' is not registered", code)
                    }),
                ),
                ExecuteError::ForbiddenStatement { .. } => (
                    StatusCode::FORBIDDEN,
                    json!({
                        "error": "forbidden_statement",
                        "message": err.to_string()
                    }),
                ),
                ExecuteError::ParameterMismatch { .. } | ExecuteError::InvalidParameter { .. } => {
                    (
                        StatusCode::BAD_REQUEST,
                        json!({
                            "error": "invalid_parameters",
                            "message": err.to_string()
                        }),
                    )
                }
                ExecuteError::LockTimeout { .. } | ExecuteError::PoolExhausted { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({
                        "error": "resource_exhausted",
                        "message": "the gateway is busy; retry later"
                    }),
                ),
                ExecuteError::Database(source) => {
                    // Log the driver detail, return a generic message
                    tracing::error!("database error: {}", source);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({
                            "error": "database_error",
                            "message": "the statement failed to execute"
                        }),
                    )
                }
                ExecuteError::Internal { reason } => {
                    tracing::error!("internal error: {}", reason);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({
                            "error": "internal_error",
                            "message": "an internal error occurred"
                        }),
                    )
                }
            },
        };

        (status, Json(body)).into_response()
    }
}

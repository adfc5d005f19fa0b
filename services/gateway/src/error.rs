//! HTTP error mapping
//!
//! Engine and storage failures translate to one JSON error shape:
//! `{"error": <code>, "message": <text>}`. Persistence and internal
//! failures are redacted on the wire; the detail goes to the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use types::errors::{EngineError, OrderError};

/// Central error type for the gateway
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Order(order_err) => match &order_err {
                OrderError::NotFound { .. } => ApiError::NotFound(order_err.to_string()),
                OrderError::InvalidModify(_) | OrderError::SelfTrade { .. } => {
                    ApiError::InvalidState(order_err.to_string())
                }
                _ => ApiError::Validation(order_err.to_string()),
            },
            EngineError::Persistence { message } => ApiError::ServiceUnavailable(message),
            EngineError::Internal { message } => ApiError::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg),
            ApiError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", msg),
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(detail = %msg, "storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE",
                    "storage temporarily unavailable".to_string(),
                )
            }
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: ApiError = EngineError::Order(OrderError::NotFound {
            order_id: "x".to_string(),
        })
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_invalid_modify_maps_to_conflict() {
        let err: ApiError =
            EngineError::Order(OrderError::InvalidModify("below filled".to_string())).into();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn test_persistence_maps_to_service_unavailable() {
        let err: ApiError = EngineError::Persistence {
            message: "disk full".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_validation_kind_for_bad_inputs() {
        let err: ApiError =
            EngineError::Order(OrderError::InvalidPrice("negative".to_string())).into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}

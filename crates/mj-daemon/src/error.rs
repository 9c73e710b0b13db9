use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mj_catalog::FieldViolation;
use thiserror::Error;
use tracing::error;

use crate::api_types::ErrorResponse;

/// Every handler failure, rendered as JSON `{error, code}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("validation failed")]
    Invalid(Vec<FieldViolation>),

    #[error("customer identity required")]
    IdentityRequired,

    #[error("admin token missing or wrong")]
    Unauthorized,

    #[error("GATE_REFUSED: no admin token configured; admin API is closed")]
    AdminClosed,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database not configured")]
    DbUnavailable,

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::IdentityRequired | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AdminClosed => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Invalid(_) => "VALIDATION_FAILED",
            ApiError::IdentityRequired => "IDENTITY_REQUIRED",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::AdminClosed => "ADMIN_CLOSED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::DbUnavailable => "DB_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // Internal detail goes to the log, not the client.
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let fields = match self {
            ApiError::Invalid(v) => v,
            _ => Vec::new(),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
                fields,
            }),
        )
            .into_response()
    }
}

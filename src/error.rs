use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("order already claimed")]
    AlreadyClaimed,

    #[error("stale version: expected {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("order not eligible for assignment")]
    NotEligible,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable discriminator, so callers can branch on the
    /// error kind without parsing the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotAuthorized(_) => "not_authorized",
            AppError::AlreadyClaimed => "already_claimed",
            AppError::StaleVersion { .. } => "stale_version",
            AppError::NotFound(_) => "not_found",
            AppError::NotEligible => "not_eligible",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidTransition(_)
            | AppError::AlreadyClaimed
            | AppError::StaleVersion { .. }
            | AppError::NotEligible => StatusCode::CONFLICT,
            AppError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "kind": self.kind(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

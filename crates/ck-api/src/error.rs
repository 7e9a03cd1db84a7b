//! API error types.
//!
//! Every failure is rendered as `{"success": false, "message": ...}`.
//! Internal detail is logged and never returned to the caller.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ck_ai::{GenerationParseError, PromptError, UpstreamError};
use ck_identity::IdentityError;
use ck_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    InsufficientCredits(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream generation failed: {0}")]
    UpstreamGenerationFailed(#[from] UpstreamError),

    #[error("Generation output unusable: {0}")]
    GenerationParse(#[from] GenerationParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn insufficient_credits(msg: impl Into<String>) -> Self {
        Self::InsufficientCredits(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientCredits(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamGenerationFailed(_) | ApiError::GenerationParse(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Store(_) | ApiError::Identity(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) => "Unauthorized".to_string(),
            ApiError::InsufficientCredits(msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::NotFound(_) => "Not found".to_string(),
            ApiError::UpstreamGenerationFailed(_) => "AI busy. Try again.".to_string(),
            ApiError::GenerationParse(_) => "Generation failed".to_string(),
            ApiError::Store(_) | ApiError::Identity(_) | ApiError::Internal(_) => {
                "Server error".to_string()
            }
        }
    }
}

impl From<PromptError> for ApiError {
    fn from(e: PromptError) -> Self {
        Self::Validation(e.user_message())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(format!("Invalid request: {}", e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        debug!("Rejected request body: {}", e.body_text());
        Self::Validation("Invalid request body".to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::InsufficientCredits(_) | ApiError::NotFound(_) => debug!("{}", self),
            ApiError::Unauthorized(_) | ApiError::Validation(_) => warn!("{}", self),
            _ => error!(status = status.as_u16(), "{}", self),
        }

        let body = ErrorResponse {
            success: false,
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

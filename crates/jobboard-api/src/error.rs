//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use jobboard_client::BoardError;
use jobboard_models::DraftValidationError;
use jobboard_supabase::SupabaseError;
use validator::ValidationErrors;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Draft rejected before reaching the backend; one message per problem.
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request body too large")]
    PayloadTooLarge,

    /// The hosted backend failed or answered with something unusable.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Upstream(_) | ApiError::Internal(_))
    }
}

impl From<SupabaseError> for ApiError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Config(msg) => ApiError::Internal(format!("configuration: {}", msg)),
            SupabaseError::NotFound(what) => ApiError::NotFound(what),
            SupabaseError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            SupabaseError::Auth { status, message } => match status {
                400 | 401 => ApiError::Unauthorized(message),
                403 => ApiError::Forbidden(message),
                422 => ApiError::BadRequest(message),
                429 => ApiError::RateLimited,
                _ => ApiError::Upstream(message),
            },
            err @ SupabaseError::Http { .. } => match err.http_status() {
                Some(401) => ApiError::unauthorized("Session expired or invalid"),
                Some(403) => ApiError::forbidden("Not allowed by the listing's access policy"),
                Some(404) => ApiError::not_found("Resource not found"),
                _ => ApiError::Upstream(err.to_string()),
            },
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(DraftValidationError::from(errors).messages)
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::Validation(e) => ApiError::Validation(e.messages),
            BoardError::SignInRequired => ApiError::unauthorized("Sign in required"),
            BoardError::NotFound(slug) => ApiError::NotFound(format!("Listing {}", slug)),
            BoardError::NotOwner(slug) => {
                ApiError::Forbidden(format!("You do not have permission to modify listing {}", slug))
            }
            BoardError::Backend(e) => e.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose backend error details in production
        let detail = if self.is_internal() {
            warn!(status = %status, "Request failed: {}", self);
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        let errors = match self {
            ApiError::Validation(messages) => Some(messages),
            _ => None,
        };

        (status, Json(ErrorResponse { detail, errors })).into_response()
    }
}

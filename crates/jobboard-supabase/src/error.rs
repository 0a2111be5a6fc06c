//! Supabase error types.

use thiserror::Error;

/// Result type for Supabase operations.
pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// Errors that can occur while talking to the hosted backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Supabase request failed ({status} {status_text}): {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Authentication failed: {message}")]
    Auth { status: u16, message: String },

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The persisted session could not be read or written.
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupabaseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Build a request failure from a non-success response.
    pub fn from_http_status(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Auth { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::PermissionDenied(_) => Some(403),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for configuration problems, which are fatal.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True when the backend rejected the caller's credentials or policy.
    pub fn is_auth_rejection(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Http { status, .. } => matches!(status, 401 | 403),
            Self::Auth { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}

//! Job board error types.

use thiserror::Error;

use jobboard_models::DraftValidationError;
use jobboard_supabase::SupabaseError;

/// Result type for job board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Errors surfaced by the job board facade.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The draft was rejected before any request was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] DraftValidationError),

    #[error("Sign in required")]
    SignInRequired,

    #[error("Listing not found: {0}")]
    NotFound(String),

    #[error("You do not have permission to modify listing {0}")]
    NotOwner(String),

    #[error(transparent)]
    Backend(#[from] SupabaseError),
}

impl BoardError {
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound(slug.into())
    }

    /// True when the error came from the hosted backend rather than local checks.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

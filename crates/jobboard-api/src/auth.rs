//! Bearer token authentication against the identity provider.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use tracing::debug;

use jobboard_client::Caller;
use jobboard_supabase::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub access_token: String,
}

impl AuthUser {
    pub fn uid(&self) -> &str {
        &self.user.id
    }

    /// The user acting on listings with their own token.
    pub fn caller(&self) -> Caller {
        Caller::new(self.user.id.clone(), self.access_token.clone())
    }
}

/// Resolve a bearer token to the user it belongs to.
async fn verify_token(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    match state.auth.get_user(token).await {
        Ok(user) => {
            debug!(uid = %user.id, "Verified access token");
            Ok(AuthUser {
                user,
                access_token: token.to_string(),
            })
        }
        Err(e) if e.is_auth_rejection() => Err(ApiError::unauthorized("Invalid or expired access token")),
        Err(e) => Err(e.into()),
    }
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Err(ApiError::unauthorized("Missing Authorization header"));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

        verify_token(state, bearer.token()).await
    }
}

/// Like [`AuthUser`], but anonymous requests pass through as `None`.
///
/// A header that is present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }
        AuthUser::from_request_parts(parts, state).await.map(|u| MaybeAuthUser(Some(u)))
    }
}

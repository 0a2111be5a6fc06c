//! Sign-up, sign-in and session handlers.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use jobboard_supabase::{Session, SignUpOutcome, SupabaseResult, User};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    /// Trim the email and validate both fields.
    fn checked(self) -> ApiResult<Self> {
        let credentials = Self {
            email: self.email.trim().to_string(),
            password: self.password,
        };
        credentials.validate()?;
        Ok(credentials)
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Stored as the new user's metadata
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpResponse {
    SignedIn { session: Session },
    ConfirmationRequired { user: User },
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
}

fn tracked<T>(action: &str, result: SupabaseResult<T>) -> SupabaseResult<T> {
    metrics::record_auth_request(action, if result.is_ok() { "ok" } else { "error" });
    result
}

/// Register with email and password.
///
/// Answers 200 with a session when the account is usable right away, or 202
/// when the user must confirm their email first.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    let credentials = request.credentials.checked()?;
    let data = if request.data.is_null() {
        serde_json::json!({})
    } else {
        request.data
    };

    let outcome = tracked(
        "sign_up",
        state
            .auth
            .sign_up(&credentials.email, &credentials.password, &data)
            .await,
    )?;
    Ok(match outcome {
        SignUpOutcome::SignedIn(session) => (StatusCode::OK, Json(SignUpResponse::SignedIn { session })),
        SignUpOutcome::ConfirmationRequired(user) => (
            StatusCode::ACCEPTED,
            Json(SignUpResponse::ConfirmationRequired { user }),
        ),
    })
}

/// Exchange email and password for a session.
pub async fn sign_in(State(state): State<AppState>, Json(credentials): Json<Credentials>) -> ApiResult<Json<Session>> {
    let credentials = credentials.checked()?;
    let session = tracked(
        "sign_in",
        state
            .auth
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await,
    )?;
    Ok(Json(session))
}

/// Exchange a refresh token for a new session.
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> ApiResult<Json<Session>> {
    if request.refresh_token.trim().is_empty() {
        return Err(ApiError::bad_request("Refresh token is required"));
    }
    let session = tracked("refresh", state.auth.refresh_session(&request.refresh_token).await)?;
    Ok(Json(session))
}

/// Revoke the caller's session.
pub async fn sign_out(State(state): State<AppState>, user: AuthUser) -> ApiResult<StatusCode> {
    tracked("sign_out", state.auth.sign_out(&user.access_token).await)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The user behind the bearer token.
pub async fn session(user: AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse { user: user.user })
}

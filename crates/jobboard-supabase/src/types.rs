//! Supabase auth (GoTrue) wire types.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl User {
    /// Email for display, or the user id when there is none.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    /// Unix timestamp when the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fill in `expires_at` from `expires_in` when the server omitted it.
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some((issued_at + Duration::seconds(self.expires_in)).timestamp());
        }
        self
    }

    pub fn expires_at_time(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    /// True when the access token expires within `margin` of `now`.
    /// Sessions without a known expiry are treated as expiring.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        match self.expires_at_time() {
            Some(at) => at - margin <= now,
            None => true,
        }
    }

    /// True while the access token has not expired yet.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_time().map_or(false, |at| at > now)
    }
}

/// Sign-up returns a session when email confirmation is disabled, otherwise
/// just the pending user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(Session),
    User(User),
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The user is signed in right away.
    SignedIn(Session),
    /// The user must confirm their email before signing in.
    ConfirmationRequired(User),
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Error body shapes returned by the identity provider.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthErrorBody {
    /// Best human-readable message, falling back to the raw body.
    pub fn message_or(self, raw: &str) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1718452800,
            "refresh_token": "refresh-1",
            "user": {
                "id": "user-1",
                "email": "ada@example.com",
                "user_metadata": { "full_name": "Ada" },
                "created_at": "2024-06-01T10:00:00Z"
            }
        })
    }

    #[test]
    fn test_sign_up_response_prefers_session() {
        let parsed: SignUpResponse = serde_json::from_value(session_json()).unwrap();
        assert!(matches!(parsed, SignUpResponse::Session(_)));

        let parsed: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": "user-2",
            "email": "new@example.com",
            "confirmation_sent_at": "2024-06-01T10:00:00Z"
        }))
        .unwrap();
        match parsed {
            SignUpResponse::User(user) => assert_eq!(user.id, "user-2"),
            other => panic!("expected pending user, got {:?}", other),
        }
    }

    #[test]
    fn test_session_expiry() {
        let session: Session = serde_json::from_value(session_json()).unwrap();
        let expires = session.expires_at_time().unwrap();

        assert!(!session.expires_within(Duration::seconds(60), expires - Duration::minutes(5)));
        assert!(session.expires_within(Duration::seconds(60), expires - Duration::seconds(30)));
        assert!(session.is_usable(expires - Duration::seconds(1)));
        assert!(!session.is_usable(expires));
    }

    #[test]
    fn test_missing_expiry_is_computed() {
        let mut json = session_json();
        json.as_object_mut().unwrap().remove("expires_at");
        let session: Session = serde_json::from_value(json).unwrap();
        assert!(session.expires_within(Duration::zero(), Utc::now()));

        let issued = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let session = session.with_expiry_from(issued);
        assert_eq!(session.expires_at, Some(issued.timestamp() + 3600));
    }

    #[test]
    fn test_auth_error_message_selection() {
        let body: AuthErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.message_or("raw"), "Invalid login credentials");

        let body: AuthErrorBody = serde_json::from_str(r#"{"code":422,"msg":"Password should be at least 6 characters"}"#).unwrap();
        assert_eq!(body.message_or("raw"), "Password should be at least 6 characters");

        assert_eq!(AuthErrorBody::default().message_or("raw"), "raw");
    }
}

//! Email/password authentication against the Supabase identity provider.

use chrono::Utc;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::types::{
    AuthErrorBody, PasswordCredentials, RefreshRequest, Session, SignUpOutcome, SignUpRequest, SignUpResponse, User,
};

/// Identity provider client.
#[derive(Clone)]
pub struct AuthClient {
    client: SupabaseClient,
}

impl AuthClient {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Register a new account.
    ///
    /// `metadata` is stored as the user's metadata. When a redirect URL is
    /// configured, confirmation emails link back to it.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> SupabaseResult<SignUpOutcome> {
        let mut url = self.client.auth_endpoint("signup");
        if let Some(redirect) = &self.client.config().auth_redirect_url {
            url = format!("{}?redirect_to={}", url, urlencoding::encode(redirect));
        }
        let body = SignUpRequest {
            email,
            password,
            data: metadata,
        };

        self.client
            .execute_request("sign_up", "auth", async {
                let request = self.client.authorize(self.client.http().post(&url), None).json(&body);
                let response: SignUpResponse = Self::parse(request.send().await?).await?;

                let outcome = match response {
                    SignUpResponse::Session(session) => {
                        info!(user_id = %session.user.id, "Signed up and signed in");
                        SignUpOutcome::SignedIn(session.with_expiry_from(Utc::now()))
                    }
                    SignUpResponse::User(user) => {
                        info!(user_id = %user.id, "Signed up, email confirmation pending");
                        SignUpOutcome::ConfirmationRequired(user)
                    }
                };
                Ok(outcome)
            })
            .await
    }

    /// Exchange email and password for a session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> SupabaseResult<Session> {
        let url = self.client.auth_endpoint("token");
        let body = PasswordCredentials { email, password };

        self.client
            .execute_request("sign_in", "auth", async {
                let request = self
                    .client
                    .authorize(self.client.http().post(&url), None)
                    .query(&[("grant_type", "password")])
                    .json(&body);
                let session: Session = Self::parse(request.send().await?).await?;
                debug!(user_id = %session.user.id, "Password sign-in succeeded");
                Ok(session.with_expiry_from(Utc::now()))
            })
            .await
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> SupabaseResult<Session> {
        let url = self.client.auth_endpoint("token");
        let body = RefreshRequest { refresh_token };

        self.client
            .execute_request("refresh", "auth", async {
                let request = self
                    .client
                    .authorize(self.client.http().post(&url), None)
                    .query(&[("grant_type", "refresh_token")])
                    .json(&body);
                let session: Session = Self::parse(request.send().await?).await?;
                Ok(session.with_expiry_from(Utc::now()))
            })
            .await
    }

    /// Revoke the session behind `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> SupabaseResult<()> {
        let url = self.client.auth_endpoint("logout");

        self.client
            .execute_request("sign_out", "auth", async {
                let request = self.client.authorize(self.client.http().post(&url), Some(access_token));
                let response = request.send().await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(Self::auth_error(response).await)
                }
            })
            .await
    }

    /// Look up the user that owns `access_token`.
    pub async fn get_user(&self, access_token: &str) -> SupabaseResult<User> {
        let url = self.client.auth_endpoint("user");

        self.client
            .execute_request("get_user", "auth", async {
                let request = self.client.authorize(self.client.http().get(&url), Some(access_token));
                Self::parse(request.send().await?).await
            })
            .await
    }

    /// Ping the identity provider.
    pub async fn health(&self) -> SupabaseResult<()> {
        let url = self.client.auth_endpoint("health");

        self.client
            .execute_request("health", "auth", async {
                let request = self.client.authorize(self.client.http().get(&url), None);
                let response = request.send().await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(SupabaseClient::handle_error_response(response).await)
                }
            })
            .await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> SupabaseResult<T> {
        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SupabaseError::invalid_response(format!("Unexpected auth response: {}", e)))
    }

    async fn auth_error(response: Response) -> SupabaseError {
        let status = response.status().as_u16();
        let raw = response.text().await.unwrap_or_default();
        let body: AuthErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        SupabaseError::auth(status, body.message_or(&raw))
    }
}

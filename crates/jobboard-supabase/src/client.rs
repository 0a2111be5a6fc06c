//! Supabase REST client.
//!
//! Production-grade client with:
//! - HTTP client tuning (pooling, timeouts)
//! - API key plus caller bearer token on every request
//! - Exact row counts through `Content-Range`
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info_span, Instrument};
use url::Url;

use crate::error::{SupabaseError, SupabaseResult};
use crate::metrics::record_request;
use crate::query::{parse_content_range_total, RestQuery};

// =============================================================================
// Configuration
// =============================================================================

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL, without trailing slash
    pub project_url: String,
    /// Public (anon) API key
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Where confirmation emails send new users after sign-up
    pub auth_redirect_url: Option<String>,
}

impl SupabaseConfig {
    /// Build a config with default timeouts.
    pub fn new(project_url: impl Into<String>, api_key: impl Into<String>) -> SupabaseResult<Self> {
        let project_url = project_url.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into().trim().to_string();

        if project_url.is_empty() {
            return Err(SupabaseError::config("Supabase project URL cannot be empty"));
        }
        if api_key.is_empty() {
            return Err(SupabaseError::config("Supabase API key cannot be empty"));
        }
        Url::parse(&project_url)
            .map_err(|e| SupabaseError::config(format!("Invalid Supabase project URL '{}': {}", project_url, e)))?;

        Ok(Self {
            project_url,
            api_key,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            auth_redirect_url: None,
        })
    }

    /// Create config from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let project_url = env_first(&["SUPABASE_PROJECT_URL", "NEXT_PUBLIC_SUPABASE_PROJECT_URL"]).ok_or_else(|| {
            SupabaseError::config("SUPABASE_PROJECT_URL or NEXT_PUBLIC_SUPABASE_PROJECT_URL must be set")
        })?;
        let api_key = env_first(&["SUPABASE_API_KEY", "NEXT_PUBLIC_SUPABASE_API_KEY"]).ok_or_else(|| {
            SupabaseError::config("SUPABASE_API_KEY or NEXT_PUBLIC_SUPABASE_API_KEY must be set")
        })?;

        let mut config = Self::new(project_url, api_key)?;

        if let Some(secs) = env_secs("SUPABASE_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("SUPABASE_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.auth_redirect_url = env_first(&["AUTH_REDIRECT_URL"]);

        Ok(config)
    }

    pub fn with_auth_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.auth_redirect_url = Some(url.into());
        self
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// Client
// =============================================================================

/// Rows returned by a counted select.
#[derive(Debug, Clone)]
pub struct CountedRows<T> {
    pub rows: Vec<T>,
    /// Exact total from `Content-Range`, when the server reported one
    pub total: Option<u64>,
}

/// Supabase REST client. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
    rest_url: String,
    auth_url: String,
}

impl SupabaseClient {
    /// Create a new client.
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobboard-supabase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SupabaseError::Network)?;

        let rest_url = format!("{}/rest/v1", config.project_url);
        let auth_url = format!("{}/auth/v1", config.project_url);

        Ok(Self {
            http,
            config,
            rest_url,
            auth_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let config = SupabaseConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    pub(crate) fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.auth_url, path.trim_start_matches('/'))
    }

    /// Attach the API key, and the caller's token when present. Anonymous
    /// requests use the API key as bearer.
    pub(crate) fn authorize(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token.unwrap_or(&self.config.api_key))
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Select rows.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
        access_token: Option<&str>,
    ) -> SupabaseResult<Vec<T>> {
        let url = self.table_url(table);

        self.execute_request("select", table, async {
            let request = self.authorize(self.http.get(&url), access_token).query(query.params());
            let response = Self::check_status(request.send().await?).await?;
            Ok(response.json::<Vec<T>>().await?)
        })
        .await
    }

    /// Select rows and ask for an exact total count.
    pub async fn select_counted<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
        access_token: Option<&str>,
    ) -> SupabaseResult<CountedRows<T>> {
        let url = self.table_url(table);

        self.execute_request("select_counted", table, async {
            let request = self
                .authorize(self.http.get(&url), access_token)
                .header("Prefer", "count=exact")
                .query(query.params());
            let response = Self::check_status(request.send().await?).await?;

            let total = response
                .headers()
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_content_range_total);
            let rows = response.json::<Vec<T>>().await?;

            debug!(rows = rows.len(), total = ?total, "Counted select");
            Ok(CountedRows { rows, total })
        })
        .await
    }

    /// Insert one row and return its stored representation.
    pub async fn insert<B, T>(&self, table: &str, body: &B, access_token: Option<&str>) -> SupabaseResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);

        self.execute_request("insert", table, async {
            let request = self
                .authorize(self.http.post(&url), access_token)
                .header("Prefer", "return=representation")
                .json(body);
            let response = Self::check_status(request.send().await?).await?;
            let mut rows = response.json::<Vec<T>>().await?;
            if rows.is_empty() {
                return Err(SupabaseError::invalid_response(format!("insert into {} returned no rows", table)));
            }
            Ok(rows.swap_remove(0))
        })
        .await
    }

    /// Update matching rows and return them.
    pub async fn update<B, T>(
        &self,
        table: &str,
        query: &RestQuery,
        body: &B,
        access_token: Option<&str>,
    ) -> SupabaseResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);

        self.execute_request("update", table, async {
            let request = self
                .authorize(self.http.patch(&url), access_token)
                .header("Prefer", "return=representation")
                .query(query.params())
                .json(body);
            let response = Self::check_status(request.send().await?).await?;
            Ok(response.json::<Vec<T>>().await?)
        })
        .await
    }

    /// Delete matching rows.
    pub async fn delete(&self, table: &str, query: &RestQuery, access_token: Option<&str>) -> SupabaseResult<()> {
        let url = self.table_url(table);

        self.execute_request("delete", table, async {
            let request = self
                .authorize(self.http.delete(&url), access_token)
                .header("Prefer", "return=minimal")
                .query(query.params());
            Self::check_status(request.send().await?).await?;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Execute a request with tracing and metrics.
    pub(crate) async fn execute_request<T, F>(&self, operation: &str, resource: &str, fut: F) -> SupabaseResult<T>
    where
        F: std::future::Future<Output = SupabaseResult<T>>,
    {
        let span = info_span!("supabase_request", operation = %operation, resource = %resource);

        let start = Instant::now();
        let result = fut.instrument(span).await;

        let status = match &result {
            Ok(_) => Some(200),
            Err(SupabaseError::Network(_)) => None,
            Err(e) => Some(e.http_status().unwrap_or(500)),
        };
        record_request(resource, operation, status, start.elapsed());

        result
    }

    async fn check_status(response: Response) -> SupabaseResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::handle_error_response(response).await)
        }
    }

    pub(crate) async fn handle_error_response(response: Response) -> SupabaseError {
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let body = response.text().await.unwrap_or_default();
        SupabaseError::from_http_status(status.as_u16(), status_text, body)
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Application state.

use std::sync::Arc;

use jobboard_client::{JobBoard, ListingBackend};
use jobboard_supabase::{AuthClient, JobRepository, SupabaseClient, SupabaseResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub board: JobBoard,
    pub auth: AuthClient,
}

impl AppState {
    /// Create application state backed by the hosted project named in the
    /// environment.
    pub fn new(config: ApiConfig) -> SupabaseResult<Self> {
        let client = SupabaseClient::from_env()?;
        let backend: Arc<dyn ListingBackend> = Arc::new(JobRepository::new(client.clone()));
        Ok(Self::with_backend(config, backend, AuthClient::new(client)))
    }

    /// Create application state over any listing backend.
    pub fn with_backend(config: ApiConfig, backend: Arc<dyn ListingBackend>, auth: AuthClient) -> Self {
        let board = JobBoard::new(backend, config.board_config());
        Self { config, board, auth }
    }
}

//! Axum HTTP API for the job board.
//!
//! This crate provides:
//! - Public listing browse/detail endpoints and owner-scoped management
//! - Email/password sign-up, sign-in and bearer token verification
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, MaybeAuthUser};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

//! Supabase REST and auth client.
//!
//! This crate provides:
//! - A REST client for PostgREST tables with exact row counts
//! - The typed `jobs` repository used by every listing view
//! - Email/password auth against the hosted identity provider
//! - A session manager with refresh, persistence and auth-change events

pub mod auth;
pub mod client;
pub mod error;
pub mod jobs_repo;
pub mod metrics;
pub mod query;
pub mod session;
pub mod types;


pub use auth::AuthClient;
pub use client::{CountedRows, SupabaseClient, SupabaseConfig};
pub use error::{SupabaseError, SupabaseResult};
pub use jobs_repo::{JobRepository, JOBS_TABLE, LISTING_ORDER};
pub use query::{parse_content_range_total, RestQuery};
pub use session::{
    AuthChangeEvent, AuthStateChange, MemorySessionStore, SessionManager, SessionPersistence,
    SESSION_REFRESH_MARGIN_SECS,
};
pub use types::{Session, SignUpOutcome, User};

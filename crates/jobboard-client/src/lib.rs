//! Cached job board client.
//!
//! This crate provides:
//! - `JobBoard`: listing views and mutations behind a stale-while-revalidate cache
//! - `AuthStore`: observable `{user, session, loading}` auth state
//! - `ListingBackend`: the storage seam, implemented for the Supabase repository
//! - `MemoryBackend`: an in-memory table with the same ordering and row policy

pub mod auth_store;
pub mod backend;
pub mod board;
pub mod cache;
pub mod error;
pub mod keys;
pub mod memory;

pub use auth_store::{AuthSnapshot, AuthStore};
pub use backend::{Caller, ListingBackend};
pub use board::{BoardConfig, JobBoard};
pub use cache::{CacheConfig, RevalidatingCache, DEFAULT_CAPACITY, DEFAULT_DEDUPE_INTERVAL};
pub use error::{BoardError, BoardResult};
pub use keys::CacheKey;
pub use memory::MemoryBackend;

//! Shared data models for the job board.
//!
//! This crate provides Serde-serializable types for:
//! - Job listings, as stored and as presented
//! - Listing status and employment type enums
//! - Page queries, filters and filter options
//! - Create/edit drafts and their validated write payloads

pub mod draft;
pub mod labels;
pub mod listing;
pub mod query;
pub mod slug;
pub mod status;

// Re-export common types
pub use draft::{
    csv_to_list, lines_to_list, list_to_csv, resolve_published_at, DraftValidationError,
    ListingDraft, ListingInput, ListingWrite, NewListingWrite,
};
pub use labels::posted_on_label;
pub use listing::{JobListing, JobRecord, ListingId};
pub use query::{FilterOptions, ListingFilters, ListingPage, ListingQuery, StatusScope, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use slug::{generate_slug, slugify};
pub use status::{JobStatus, JobType, ParseEnumError};

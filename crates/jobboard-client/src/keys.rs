//! Cache keys for listing views.

use jobboard_models::ListingFilters;

/// Identifies one cached read.
///
/// Owner views carry the caller's auth tag so a sign-in change never serves
/// entries fetched under other credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PublishedPage {
        page: u32,
        page_size: u32,
        filters: ListingFilters,
    },
    PublishedFilters {
        poster_id: Option<String>,
    },
    OwnerPage {
        owner_id: String,
        auth: u64,
        page: u32,
        page_size: u32,
        filters: ListingFilters,
    },
    OwnerFilters {
        owner_id: String,
        auth: u64,
    },
    Listing {
        slug: String,
    },
    OwnerListing {
        owner_id: String,
        slug: String,
    },
    PublishedSlugs,
}

impl CacheKey {
    /// Keys whose value depends on the set of listings rather than one row.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::PublishedPage { .. }
                | Self::PublishedFilters { .. }
                | Self::OwnerPage { .. }
                | Self::OwnerFilters { .. }
                | Self::PublishedSlugs
        )
    }

    /// Detail keys for `slug`.
    pub fn is_detail_for(&self, slug: &str) -> bool {
        match self {
            Self::Listing { slug: s } | Self::OwnerListing { slug: s, .. } => s == slug,
            _ => false,
        }
    }
}

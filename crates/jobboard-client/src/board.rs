//! Job board facade: cached listing reads and cache-aware mutations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use jobboard_models::{
    FilterOptions, JobListing, ListingDraft, ListingFilters, ListingPage, ListingQuery, StatusScope, DEFAULT_PAGE_SIZE,
};

use crate::backend::{Caller, ListingBackend};
use crate::cache::{CacheConfig, RevalidatingCache};
use crate::error::{BoardError, BoardResult};
use crate::keys::CacheKey;

/// Job board settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Listings per page
    pub page_size: u32,
    pub cache: CacheConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache: CacheConfig::default(),
        }
    }
}

/// Entry point for every listing view and mutation. Cheap to clone.
#[derive(Clone)]
pub struct JobBoard {
    backend: Arc<dyn ListingBackend>,
    pages: RevalidatingCache<CacheKey, ListingPage>,
    filters: RevalidatingCache<CacheKey, FilterOptions>,
    listings: RevalidatingCache<CacheKey, Option<JobListing>>,
    slugs: RevalidatingCache<CacheKey, Vec<String>>,
    page_size: u32,
}

fn require(caller: Option<&Caller>) -> BoardResult<&Caller> {
    caller.ok_or(BoardError::SignInRequired)
}

impl JobBoard {
    pub fn new(backend: Arc<dyn ListingBackend>, config: BoardConfig) -> Self {
        Self {
            backend,
            pages: RevalidatingCache::new(config.cache),
            filters: RevalidatingCache::new(config.cache),
            listings: RevalidatingCache::new(config.cache),
            slugs: RevalidatingCache::new(config.cache),
            page_size: config.page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn backend(&self) -> &Arc<dyn ListingBackend> {
        &self.backend
    }

    // =========================================================================
    // Public Views
    // =========================================================================

    /// One page of published listings.
    pub async fn browse(&self, filters: ListingFilters, page: u32) -> BoardResult<ListingPage> {
        let query = ListingQuery::published(filters, page, self.page_size);
        let key = CacheKey::PublishedPage {
            page: query.page,
            page_size: query.page_size,
            filters: query.filters.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let page = self
            .pages
            .get_or_fetch(key, move || async move { backend.list(&query, None).await })
            .await?;
        Ok(page)
    }

    /// Filter values over published listings, optionally of one poster.
    pub async fn filter_options(&self, poster_id: Option<String>) -> BoardResult<FilterOptions> {
        let filters = ListingFilters {
            poster_id,
            ..ListingFilters::default()
        }
        .normalized();
        let key = CacheKey::PublishedFilters {
            poster_id: filters.poster_id.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let options = self
            .filters
            .get_or_fetch(key, move || async move {
                backend
                    .filter_options(&filters, StatusScope::PublishedOnly, None)
                    .await
            })
            .await?;
        Ok(options)
    }

    /// Published listing detail.
    pub async fn listing(&self, slug: &str) -> BoardResult<Option<JobListing>> {
        let slug = slug.trim().to_string();
        if slug.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::Listing { slug: slug.clone() };

        let backend = Arc::clone(&self.backend);
        let listing = self
            .listings
            .get_or_fetch(key, move || async move { backend.get_by_slug(&slug).await })
            .await?;
        Ok(listing)
    }

    /// Slugs of every published listing.
    pub async fn published_slugs(&self) -> BoardResult<Vec<String>> {
        let backend = Arc::clone(&self.backend);
        let slugs = self
            .slugs
            .get_or_fetch(CacheKey::PublishedSlugs, move || async move {
                backend.published_slugs().await
            })
            .await?;
        Ok(slugs)
    }

    // =========================================================================
    // Owner Views
    // =========================================================================

    /// One page of the caller's listings in every status.
    pub async fn my_listings(
        &self,
        caller: Option<&Caller>,
        filters: ListingFilters,
        page: u32,
    ) -> BoardResult<ListingPage> {
        let caller = require(caller)?.clone();
        let query = ListingQuery::owned_by(caller.user_id.clone(), filters, page, self.page_size);
        let key = CacheKey::OwnerPage {
            owner_id: caller.user_id.clone(),
            auth: caller.auth_tag(),
            page: query.page,
            page_size: query.page_size,
            filters: query.filters.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let page = self
            .pages
            .get_or_fetch(key, move || async move { backend.list(&query, Some(&caller)).await })
            .await?;
        Ok(page)
    }

    /// Filter values over the caller's listings.
    pub async fn my_filter_options(&self, caller: Option<&Caller>) -> BoardResult<FilterOptions> {
        let caller = require(caller)?.clone();
        let key = CacheKey::OwnerFilters {
            owner_id: caller.user_id.clone(),
            auth: caller.auth_tag(),
        };
        let filters = ListingFilters::default().with_poster(caller.user_id.clone());

        let backend = Arc::clone(&self.backend);
        let options = self
            .filters
            .get_or_fetch(key, move || async move {
                backend
                    .filter_options(&filters, StatusScope::AnyStatus, Some(&caller))
                    .await
            })
            .await?;
        Ok(options)
    }

    /// The caller's own listing, any status. `None` for other posters' slugs.
    pub async fn my_listing(&self, caller: Option<&Caller>, slug: &str) -> BoardResult<Option<JobListing>> {
        let caller = require(caller)?.clone();
        let slug = slug.trim().to_string();
        if slug.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::OwnerListing {
            owner_id: caller.user_id.clone(),
            slug: slug.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let listing = self
            .listings
            .get_or_fetch(key, move || async move {
                backend.get_by_slug_for_owner(&slug, &caller).await
            })
            .await?;
        Ok(listing)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a listing owned by the caller.
    pub async fn create_listing(&self, caller: Option<&Caller>, draft: ListingDraft) -> BoardResult<JobListing> {
        let caller = require(caller)?;
        let input = draft.prepare(None, Utc::now())?;
        let write = input.to_new_write(caller.user_id.clone());

        let listing = self.backend.create(&write, caller).await?;
        info!(
            "Created listing: slug={}, status={}, poster={}",
            listing.slug, listing.job_status, caller.user_id
        );

        self.after_write(&listing.slug, Some(&listing)).await;
        Ok(listing)
    }

    /// Overwrite the caller's listing with `draft`. The slug never changes.
    pub async fn update_listing(
        &self,
        caller: Option<&Caller>,
        slug: &str,
        draft: ListingDraft,
    ) -> BoardResult<JobListing> {
        let caller = require(caller)?;
        draft.check()?;

        let existing = self.owned_listing(caller, slug).await?;
        let input = draft.prepare(existing.published_at, Utc::now())?;

        let updated = self
            .backend
            .update(&existing.id, &input.to_write(), caller)
            .await?;
        info!("Updated listing: slug={}, status={}", updated.slug, updated.job_status);

        self.after_write(&existing.slug, Some(&updated)).await;
        Ok(updated)
    }

    /// Delete the caller's listing. Confirmation is the surface's job.
    pub async fn delete_listing(&self, caller: Option<&Caller>, slug: &str) -> BoardResult<()> {
        let caller = require(caller)?;
        let existing = self.owned_listing(caller, slug).await?;

        self.backend.delete(&existing.id, caller).await?;
        info!("Deleted listing: slug={}, poster={}", existing.slug, caller.user_id);

        self.after_write(&existing.slug, None).await;
        Ok(())
    }

    /// Drop every cached entry, e.g. after the signed-in user changes.
    pub async fn clear_cache(&self) {
        self.pages.clear().await;
        self.filters.clear().await;
        self.listings.clear().await;
        self.slugs.clear().await;
    }

    /// Fresh lookup of a listing the caller must own.
    async fn owned_listing(&self, caller: &Caller, slug: &str) -> BoardResult<JobListing> {
        let slug = slug.trim();
        if let Some(listing) = self.backend.get_by_slug_for_owner(slug, caller).await? {
            return Ok(listing);
        }
        match self.backend.get_by_slug(slug).await? {
            Some(_) => Err(BoardError::NotOwner(slug.to_string())),
            None => Err(BoardError::not_found(slug)),
        }
    }

    /// Invalidate every view a write to `slug` can change, then seed the
    /// detail entries with the written row (or its absence).
    async fn after_write(&self, slug: &str, written: Option<&JobListing>) {
        let pages = self.pages.invalidate_where(CacheKey::is_collection).await;
        let filters = self.filters.invalidate_where(CacheKey::is_collection).await;
        let slugs = self.slugs.invalidate_where(CacheKey::is_collection).await;
        let details = self.listings.invalidate_where(|k| k.is_detail_for(slug)).await;
        debug!(slug, pages, filters, slugs, details, "Invalidated cached views");

        let public_key = CacheKey::Listing { slug: slug.to_string() };
        match written {
            Some(listing) => {
                let public = listing.is_published().then(|| listing.clone());
                self.listings.mutate(public_key, public).await;
                self.listings
                    .mutate(
                        CacheKey::OwnerListing {
                            owner_id: listing.poster_id.clone(),
                            slug: slug.to_string(),
                        },
                        Some(listing.clone()),
                    )
                    .await;
            }
            None => self.listings.mutate(public_key, None).await,
        }
    }
}

//! Repository for the `jobs` table.
//!
//! Public reads go out with the API key only, so row policy limits them to
//! published listings. Owner reads and every write carry the caller's
//! access token.

use serde::Deserialize;
use tracing::{info, warn};

use jobboard_models::{
    FilterOptions, JobListing, JobRecord, JobType, ListingFilters, ListingId, ListingPage, ListingQuery,
    ListingWrite, NewListingWrite, StatusScope,
};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::query::RestQuery;

/// Table holding listings.
pub const JOBS_TABLE: &str = "jobs";

/// Newest publish first, unpublished last, then newest created.
pub const LISTING_ORDER: &str = "published_at.desc.nullslast,created_at.desc";

const PUBLISHED: &str = "published";

#[derive(Debug, Deserialize)]
struct FilterRow {
    location: String,
    job_type: JobType,
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    #[serde(default)]
    slug: Option<String>,
}

/// Repository for job listings.
#[derive(Clone)]
pub struct JobRepository {
    client: SupabaseClient,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    fn filtered(filters: &ListingFilters, scope: StatusScope) -> RestQuery {
        let query = RestQuery::new()
            .eq_opt("location", filters.location.as_deref())
            .eq_opt("job_type", filters.job_type.map(|t| t.as_str()))
            .eq_opt("poster_id", filters.poster_id.as_deref());

        match scope {
            StatusScope::PublishedOnly => query.eq("job_status", PUBLISHED),
            StatusScope::AnyStatus => query,
        }
    }

    /// One page of listings plus the total number of matches.
    pub async fn list(&self, query: &ListingQuery, access_token: Option<&str>) -> SupabaseResult<ListingPage> {
        let rest = Self::filtered(&query.filters, query.scope)
            .select("*")
            .order(LISTING_ORDER)
            .limit(query.limit())
            .offset(query.offset());

        let counted = self
            .client
            .select_counted::<JobRecord>(JOBS_TABLE, &rest, access_token)
            .await?;

        let returned = counted.rows.len() as u64;
        let total = counted.total.unwrap_or_else(|| {
            warn!(page = query.page, "Backend returned no exact count; estimating total");
            query.offset() + returned
        });

        Ok(ListingPage {
            listings: counted.rows.into_iter().map(JobListing::from).collect(),
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    /// Distinct locations and job types visible in a view.
    pub async fn filter_options(
        &self,
        filters: &ListingFilters,
        scope: StatusScope,
        access_token: Option<&str>,
    ) -> SupabaseResult<FilterOptions> {
        let owner_only = ListingFilters {
            poster_id: filters.poster_id.clone(),
            ..ListingFilters::default()
        };
        let rest = Self::filtered(&owner_only, scope).select("location,job_type");

        let rows = self
            .client
            .select::<FilterRow>(JOBS_TABLE, &rest, access_token)
            .await?;

        Ok(FilterOptions::collect(rows.into_iter().map(|r| (r.location, r.job_type))))
    }

    /// Slugs of every published listing.
    pub async fn published_slugs(&self) -> SupabaseResult<Vec<String>> {
        let rest = RestQuery::new()
            .select("slug")
            .eq("job_status", PUBLISHED)
            .not_null("slug");

        let rows = self.client.select::<SlugRow>(JOBS_TABLE, &rest, None).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.slug)
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// Public detail lookup. Only published listings are returned.
    pub async fn get_by_slug(&self, slug: &str) -> SupabaseResult<Option<JobListing>> {
        if slug.trim().is_empty() {
            return Ok(None);
        }
        let rest = RestQuery::new()
            .select("*")
            .eq("slug", slug)
            .eq("job_status", PUBLISHED)
            .limit(1);

        self.first(&rest, None).await
    }

    /// Owner detail lookup in any status. Returns `None` when the listing
    /// belongs to someone else.
    pub async fn get_by_slug_for_owner(
        &self,
        slug: &str,
        owner_id: &str,
        access_token: &str,
    ) -> SupabaseResult<Option<JobListing>> {
        if slug.trim().is_empty() {
            return Ok(None);
        }
        let rest = RestQuery::new().select("*").eq("slug", slug).limit(1);

        let listing = self.first(&rest, Some(access_token)).await?;
        Ok(listing.filter(|l| l.is_owned_by(owner_id)))
    }

    /// Insert a new listing.
    pub async fn create(&self, write: &NewListingWrite, access_token: &str) -> SupabaseResult<JobListing> {
        let record: JobRecord = self.client.insert(JOBS_TABLE, write, Some(access_token)).await?;

        info!(
            "Created listing: id={}, slug={}, status={}",
            record.id,
            write.slug,
            record.job_status
        );
        Ok(JobListing::from(record))
    }

    /// Overwrite every editable field of a listing.
    ///
    /// Row policy hides other users' rows, so an update that matches nothing
    /// is reported as not found.
    pub async fn update(&self, id: &ListingId, write: &ListingWrite, access_token: &str) -> SupabaseResult<JobListing> {
        let rest = RestQuery::new().eq("id", id.as_str());
        let mut rows: Vec<JobRecord> = self
            .client
            .update(JOBS_TABLE, &rest, write, Some(access_token))
            .await?;

        if rows.is_empty() {
            return Err(SupabaseError::not_found(format!("{}/{}", JOBS_TABLE, id)));
        }
        let record = rows.swap_remove(0);
        info!("Updated listing: id={}, status={}", record.id, record.job_status);
        Ok(JobListing::from(record))
    }

    /// Delete a listing. No confirmation or version check happens here.
    pub async fn delete(&self, id: &ListingId, access_token: &str) -> SupabaseResult<()> {
        let rest = RestQuery::new().eq("id", id.as_str());
        self.client.delete(JOBS_TABLE, &rest, Some(access_token)).await?;
        info!("Deleted listing: id={}", id);
        Ok(())
    }

    async fn first(&self, rest: &RestQuery, access_token: Option<&str>) -> SupabaseResult<Option<JobListing>> {
        let rows = self
            .client
            .select::<JobRecord>(JOBS_TABLE, rest, access_token)
            .await?;
        Ok(rows.into_iter().next().map(JobListing::from))
    }
}


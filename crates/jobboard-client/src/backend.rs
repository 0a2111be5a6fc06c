//! Storage seam between the job board and the hosted backend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use jobboard_models::{
    FilterOptions, JobListing, ListingFilters, ListingId, ListingPage, ListingQuery, ListingWrite, NewListingWrite,
    StatusScope,
};
use jobboard_supabase::{JobRepository, Session, SupabaseResult};

/// An authenticated user acting on listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub access_token: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::new(session.user.id.clone(), session.access_token.clone())
    }

    /// Fingerprint of the credentials, used to key cached owner views so a
    /// new token never reads entries fetched under an old one.
    pub fn auth_tag(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.user_id.hash(&mut hasher);
        self.access_token.hash(&mut hasher);
        hasher.finish()
    }
}

/// Listing storage operations.
#[async_trait]
pub trait ListingBackend: Send + Sync {
    /// Page of listings matching the query, with total count.
    async fn list(&self, query: &ListingQuery, caller: Option<&Caller>) -> SupabaseResult<ListingPage>;

    /// Distinct filter values visible in a view.
    async fn filter_options(
        &self,
        filters: &ListingFilters,
        scope: StatusScope,
        caller: Option<&Caller>,
    ) -> SupabaseResult<FilterOptions>;

    async fn published_slugs(&self) -> SupabaseResult<Vec<String>>;

    /// Published listing by slug.
    async fn get_by_slug(&self, slug: &str) -> SupabaseResult<Option<JobListing>>;

    /// Caller's own listing by slug, in any status.
    async fn get_by_slug_for_owner(&self, slug: &str, caller: &Caller) -> SupabaseResult<Option<JobListing>>;

    async fn create(&self, write: &NewListingWrite, caller: &Caller) -> SupabaseResult<JobListing>;

    async fn update(&self, id: &ListingId, write: &ListingWrite, caller: &Caller) -> SupabaseResult<JobListing>;

    async fn delete(&self, id: &ListingId, caller: &Caller) -> SupabaseResult<()>;
}

#[async_trait]
impl ListingBackend for JobRepository {
    async fn list(&self, query: &ListingQuery, caller: Option<&Caller>) -> SupabaseResult<ListingPage> {
        JobRepository::list(self, query, caller.map(|c| c.access_token.as_str())).await
    }

    async fn filter_options(
        &self,
        filters: &ListingFilters,
        scope: StatusScope,
        caller: Option<&Caller>,
    ) -> SupabaseResult<FilterOptions> {
        JobRepository::filter_options(self, filters, scope, caller.map(|c| c.access_token.as_str())).await
    }

    async fn published_slugs(&self) -> SupabaseResult<Vec<String>> {
        JobRepository::published_slugs(self).await
    }

    async fn get_by_slug(&self, slug: &str) -> SupabaseResult<Option<JobListing>> {
        JobRepository::get_by_slug(self, slug).await
    }

    async fn get_by_slug_for_owner(&self, slug: &str, caller: &Caller) -> SupabaseResult<Option<JobListing>> {
        JobRepository::get_by_slug_for_owner(self, slug, &caller.user_id, &caller.access_token).await
    }

    async fn create(&self, write: &NewListingWrite, caller: &Caller) -> SupabaseResult<JobListing> {
        JobRepository::create(self, write, &caller.access_token).await
    }

    async fn update(&self, id: &ListingId, write: &ListingWrite, caller: &Caller) -> SupabaseResult<JobListing> {
        JobRepository::update(self, id, write, &caller.access_token).await
    }

    async fn delete(&self, id: &ListingId, caller: &Caller) -> SupabaseResult<()> {
        JobRepository::delete(self, id, &caller.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_tag_changes_with_token() {
        let a = Caller::new("user-1", "token-a");
        let b = Caller::new("user-1", "token-b");
        assert_eq!(a.auth_tag(), a.clone().auth_tag());
        assert_ne!(a.auth_tag(), b.auth_tag());
    }
}

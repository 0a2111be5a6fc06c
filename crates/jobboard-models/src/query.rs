//! Listing query, page and filter option types.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::listing::{JobListing, JobRecord};
use crate::status::JobType;

/// Listings per page when the caller does not ask for a size.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Which statuses a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusScope {
    /// Public views: published listings only
    #[default]
    PublishedOnly,
    /// Owner views: every status
    AnyStatus,
}

/// Equality filters shared by list and filter-option queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ListingFilters {
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub poster_id: Option<String>,
}

impl ListingFilters {
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn with_poster(mut self, poster_id: impl Into<String>) -> Self {
        self.poster_id = Some(poster_id.into());
        self
    }

    /// Treat blank and "all" selections as no filter.
    pub fn normalized(self) -> Self {
        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("all"));
        let poster_id = self
            .poster_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self {
            location,
            job_type: self.job_type,
            poster_id,
        }
    }

    /// True when a stored row satisfies every filter that is set.
    pub fn matches(&self, record: &JobRecord) -> bool {
        self.location.as_deref().map_or(true, |l| record.location == l)
            && self.job_type.map_or(true, |t| record.job_type == t)
            && self.poster_id.as_deref().map_or(true, |p| record.poster_id == p)
    }
}

/// A page request against the listings table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingQuery {
    pub filters: ListingFilters,
    pub scope: StatusScope,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            filters: ListingFilters::default(),
            scope: StatusScope::PublishedOnly,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListingQuery {
    pub fn published(filters: ListingFilters, page: u32, page_size: u32) -> Self {
        Self {
            filters: filters.normalized(),
            scope: StatusScope::PublishedOnly,
            page,
            page_size,
        }
        .clamped()
    }

    pub fn owned_by(owner_id: impl Into<String>, filters: ListingFilters, page: u32, page_size: u32) -> Self {
        Self {
            filters: filters.normalized().with_poster(owner_id),
            scope: StatusScope::AnyStatus,
            page,
            page_size,
        }
        .clamped()
    }

    /// Page 0 becomes page 1; page size is kept within `1..=MAX_PAGE_SIZE`.
    pub fn clamped(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Row offset of the first listing on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of listings plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub listings: Vec<JobListing>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ListingPage {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            listings: Vec::new(),
            total: 0,
            page,
            page_size,
        }
    }

    /// Number of pages, never less than one.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(u64::from(self.page_size)).max(1)
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Distinct values available for the filter drop-downs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub job_types: Vec<JobType>,
}

impl FilterOptions {
    /// Collect sorted, de-duplicated options from `(location, job_type)` pairs.
    pub fn collect<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, JobType)>,
    {
        let mut locations = BTreeSet::new();
        let mut job_types = BTreeSet::new();
        for (location, job_type) in pairs {
            let location = location.trim().to_string();
            if !location.is_empty() {
                locations.insert(location);
            }
            job_types.insert(job_type);
        }
        Self {
            locations: locations.into_iter().collect(),
            job_types: job_types.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_offsets() {
        let query = ListingQuery::published(ListingFilters::default(), 3, 5);
        assert_eq!(query.offset(), 10);
        assert_eq!(query.limit(), 5);

        let query = ListingQuery::published(ListingFilters::default(), 0, 0);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 1);
        assert_eq!(query.offset(), 0);

        let query = ListingQuery::published(ListingFilters::default(), 1, 10_000);
        assert_eq!(query.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_owner_query_scopes_to_owner() {
        let query = ListingQuery::owned_by("user-1", ListingFilters::default().with_poster("someone-else"), 1, 5);
        assert_eq!(query.scope, StatusScope::AnyStatus);
        assert_eq!(query.filters.poster_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_filters_normalize_all_and_blank() {
        let filters = ListingFilters::default().with_location("all").with_poster("  ").normalized();
        assert!(filters.location.is_none());
        assert!(filters.poster_id.is_none());

        let filters = ListingFilters::default().with_location(" Berlin ").normalized();
        assert_eq!(filters.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_filters_match_rows() {
        let record: JobRecord = serde_json::from_value(serde_json::json!({
            "id": "1",
            "title": "Engineer",
            "company_name": "Acme",
            "location": "Berlin",
            "job_type": "Contract",
            "job_status": "published",
            "created_at": "2024-06-01T00:00:00Z",
            "updated_at": "2024-06-01T00:00:00Z",
            "poster_id": "user-1"
        }))
        .unwrap();

        assert!(ListingFilters::default().matches(&record));
        assert!(ListingFilters::default()
            .with_location("Berlin")
            .with_job_type(JobType::Contract)
            .with_poster("user-1")
            .matches(&record));
        assert!(!ListingFilters::default().with_location("Remote").matches(&record));
        assert!(!ListingFilters::default().with_job_type(JobType::FullTime).matches(&record));
        assert!(!ListingFilters::default().with_poster("user-2").matches(&record));
    }

    #[test]
    fn test_total_pages() {
        let mut page = ListingPage::empty(1, 5);
        assert_eq!(page.total_pages(), 1);
        page.total = 11;
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        page.page = 3;
        assert!(!page.has_next());
    }

    #[test]
    fn test_filter_options_sorted_and_distinct() {
        let options = FilterOptions::collect(vec![
            ("Seattle, WA".to_string(), JobType::Contract),
            ("Berlin".to_string(), JobType::FullTime),
            ("Seattle, WA".to_string(), JobType::FullTime),
            ("  ".to_string(), JobType::PartTime),
        ]);
        assert_eq!(options.locations, vec!["Berlin".to_string(), "Seattle, WA".to_string()]);
        assert_eq!(
            options.job_types,
            vec![JobType::FullTime, JobType::PartTime, JobType::Contract]
        );
    }
}

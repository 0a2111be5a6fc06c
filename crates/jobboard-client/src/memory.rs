//! In-memory listing backend.
//!
//! Behaves like the hosted table: the same ordering, exact totals, and the
//! row policy that lets everyone read published rows while only the poster
//! may read unpublished rows or write at all. Used by tests and local demos.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use jobboard_models::{
    FilterOptions, JobListing, JobRecord, ListingFilters, ListingId, ListingPage, ListingQuery, ListingWrite,
    NewListingWrite, StatusScope,
};
use jobboard_supabase::{SupabaseError, SupabaseResult};

use crate::backend::{Caller, ListingBackend};

/// In-memory `jobs` table.
#[derive(Default)]
pub struct MemoryBackend {
    rows: RwLock<Vec<JobRecord>>,
    last_write: RwLock<Option<DateTime<Utc>>>,
    requests: AtomicUsize,
    failing: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as-is, bypassing row policy.
    pub async fn insert_record(&self, record: JobRecord) {
        self.rows.write().await.push(record);
    }

    /// Number of backend calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make every following call fail with a 503 until turned off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every following call, like a slow network.
    pub fn set_latency(&self, latency: StdDuration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn begin(&self) -> SupabaseResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(StdDuration::from_millis(latency)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SupabaseError::from_http_status(503, "Service Unavailable", "backend offline"));
        }
        Ok(())
    }

    /// Strictly increasing write timestamps, so rows created back to back
    /// still order deterministically.
    async fn write_time(&self) -> DateTime<Utc> {
        let mut last = self.last_write.write().await;
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    fn visible(record: &JobRecord, caller: Option<&Caller>) -> bool {
        record.job_status.is_published() || caller.map_or(false, |c| c.user_id == record.poster_id)
    }

    fn matches(record: &JobRecord, filters: &ListingFilters, scope: StatusScope) -> bool {
        if scope == StatusScope::PublishedOnly && !record.job_status.is_published() {
            return false;
        }
        filters.matches(record)
    }
}

/// `published_at desc nulls last, created_at desc`
fn listing_order(a: &JobRecord, b: &JobRecord) -> CmpOrdering {
    let by_published = match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    };
    by_published.then_with(|| b.created_at.cmp(&a.created_at))
}

fn apply_write(record: &mut JobRecord, write: &ListingWrite) {
    record.title = write.title.clone();
    record.company_name = write.company_name.clone();
    record.location = write.location.clone();
    record.job_type = write.job_type;
    record.job_status = write.job_status;
    record.overview = write.overview.clone();
    record.description = write.description.clone();
    record.responsibilities = Some(write.responsibilities.clone());
    record.requirements = Some(write.requirements.clone());
    record.benefits = Some(write.benefits.clone());
    record.about_company = write.about_company.clone();
    record.application_url = write.application_url.clone();
    record.application_email = write.application_email.clone();
    record.salary_min = write.salary_min;
    record.salary_max = write.salary_max;
    record.salary_currency = write.salary_currency.clone();
    record.tags = Some(write.tags.clone());
    record.published_at = write.published_at;
}

#[async_trait]
impl ListingBackend for MemoryBackend {
    async fn list(&self, query: &ListingQuery, caller: Option<&Caller>) -> SupabaseResult<ListingPage> {
        self.begin().await?;
        let rows = self.rows.read().await;

        let mut matching: Vec<&JobRecord> = rows
            .iter()
            .filter(|r| Self::visible(r, caller) && Self::matches(r, &query.filters, query.scope))
            .collect();
        matching.sort_by(|a, b| listing_order(a, b));

        let total = matching.len() as u64;
        let listings = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .map(JobListing::from)
            .collect();

        Ok(ListingPage {
            listings,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn filter_options(
        &self,
        filters: &ListingFilters,
        scope: StatusScope,
        caller: Option<&Caller>,
    ) -> SupabaseResult<FilterOptions> {
        self.begin().await?;
        let owner_only = ListingFilters {
            poster_id: filters.poster_id.clone(),
            ..ListingFilters::default()
        };
        let rows = self.rows.read().await;

        Ok(FilterOptions::collect(
            rows.iter()
                .filter(|r| Self::visible(r, caller) && Self::matches(r, &owner_only, scope))
                .map(|r| (r.location.clone(), r.job_type)),
        ))
    }

    async fn published_slugs(&self) -> SupabaseResult<Vec<String>> {
        self.begin().await?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.job_status.is_published())
            .filter_map(|r| r.slug.clone())
            .filter(|s| !s.is_empty())
            .collect())
    }

    async fn get_by_slug(&self, slug: &str) -> SupabaseResult<Option<JobListing>> {
        if slug.trim().is_empty() {
            return Ok(None);
        }
        self.begin().await?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.slug.as_deref() == Some(slug) && r.job_status.is_published())
            .cloned()
            .map(JobListing::from))
    }

    async fn get_by_slug_for_owner(&self, slug: &str, caller: &Caller) -> SupabaseResult<Option<JobListing>> {
        if slug.trim().is_empty() {
            return Ok(None);
        }
        self.begin().await?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.slug.as_deref() == Some(slug) && Self::visible(r, Some(caller)))
            .filter(|r| r.poster_id == caller.user_id)
            .cloned()
            .map(JobListing::from))
    }

    async fn create(&self, write: &NewListingWrite, caller: &Caller) -> SupabaseResult<JobListing> {
        self.begin().await?;
        if write.poster_id != caller.user_id {
            return Err(SupabaseError::PermissionDenied(
                "new row violates row-level security policy for table \"jobs\"".to_string(),
            ));
        }

        let now = self.write_time().await;
        let mut record = JobRecord {
            id: ListingId::from_string(Uuid::new_v4().to_string()),
            slug: Some(write.slug.clone()),
            title: String::new(),
            company_name: String::new(),
            location: String::new(),
            job_type: write.fields.job_type,
            job_status: write.fields.job_status,
            overview: None,
            description: None,
            responsibilities: None,
            requirements: None,
            benefits: None,
            about_company: None,
            application_url: None,
            application_email: None,
            published_at: None,
            created_at: now,
            updated_at: now,
            poster_id: write.poster_id.clone(),
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            tags: None,
            metadata: None,
        };
        apply_write(&mut record, &write.fields);

        self.rows.write().await.push(record.clone());
        Ok(JobListing::from(record))
    }

    async fn update(&self, id: &ListingId, write: &ListingWrite, caller: &Caller) -> SupabaseResult<JobListing> {
        self.begin().await?;
        let now = self.write_time().await;
        let mut rows = self.rows.write().await;

        // Rows owned by someone else are invisible to the update
        let record = rows
            .iter_mut()
            .find(|r| &r.id == id && r.poster_id == caller.user_id)
            .ok_or_else(|| SupabaseError::not_found(format!("jobs/{}", id)))?;

        apply_write(record, write);
        record.updated_at = now;
        Ok(JobListing::from(record.clone()))
    }

    async fn delete(&self, id: &ListingId, caller: &Caller) -> SupabaseResult<()> {
        self.begin().await?;
        self.rows
            .write()
            .await
            .retain(|r| !(&r.id == id && r.poster_id == caller.user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobboard_models::JobStatus;

    fn record(id: &str, published: Option<DateTime<Utc>>, created: DateTime<Utc>) -> JobRecord {
        let status = if published.is_some() { "published" } else { "draft" };
        serde_json::from_value(serde_json::json!({
            "id": id,
            "slug": id,
            "title": "Engineer",
            "company_name": "Acme",
            "location": "Remote",
            "job_type": "Full-Time",
            "job_status": status,
            "published_at": published,
            "created_at": created,
            "updated_at": created,
            "poster_id": "user-1"
        }))
        .unwrap()
    }

    #[test]
    fn test_order_puts_unpublished_last() {
        let t = |d: i64| Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::days(d);
        let mut rows = vec![
            record("draft-new", None, t(9)),
            record("old", Some(t(1)), t(0)),
            record("new", Some(t(5)), t(0)),
            record("draft-old", None, t(2)),
        ];
        rows.sort_by(listing_order);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "draft-new", "draft-old"]);
    }

    #[tokio::test]
    async fn test_unpublished_rows_hidden_from_others() {
        let backend = MemoryBackend::new();
        let created = Utc::now();
        backend.insert_record(record("draft", None, created)).await;

        let owner = Caller::new("user-1", "t1");
        let other = Caller::new("user-2", "t2");
        let query = ListingQuery {
            scope: StatusScope::AnyStatus,
            ..ListingQuery::default()
        };

        assert_eq!(backend.list(&query, Some(&owner)).await.unwrap().total, 1);
        assert_eq!(backend.list(&query, Some(&other)).await.unwrap().total, 0);
        assert!(backend.get_by_slug_for_owner("draft", &other).await.unwrap().is_none());
        assert_eq!(
            backend.get_by_slug_for_owner("draft", &owner).await.unwrap().map(|l| l.job_status),
            Some(JobStatus::Draft)
        );
    }

    #[tokio::test]
    async fn test_failing_mode_returns_request_failure() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);
        let err = backend.published_slugs().await.unwrap_err();
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(backend.request_count(), 1);
    }
}

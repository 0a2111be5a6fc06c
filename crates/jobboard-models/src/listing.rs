//! Job listing models.
//!
//! `JobRecord` mirrors the `jobs` table row as the REST API returns it.
//! `JobListing` is the normalized shape the rest of the workspace works
//! with: no nullable lists, no nullable slug, plus a display label.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::labels::posted_on_label;
use crate::status::{JobStatus, JobType};

/// Opaque listing identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ListingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ListingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A row of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: ListingId,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub job_status: JobStatus,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<Vec<String>>,
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
    #[serde(default)]
    pub about_company: Option<String>,
    #[serde(default)]
    pub application_url: Option<String>,
    #[serde(default)]
    pub application_email: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub poster_id: String,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub salary_currency: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A job listing as presented to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: ListingId,
    pub slug: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub job_status: JobStatus,
    pub overview: String,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub about_company: String,
    pub application_url: Option<String>,
    pub application_email: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Display label such as "Published 2 days ago"
    pub posted_on: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub tags: Vec<String>,
    pub poster_id: String,
}

impl JobListing {
    /// Normalize a storage row, computing labels relative to `now`.
    pub fn from_record_at(record: JobRecord, now: DateTime<Utc>) -> Self {
        let posted_on = posted_on_label(record.job_status, record.published_at, record.created_at, now);

        let description = record
            .description
            .clone()
            .or_else(|| record.overview.clone())
            .unwrap_or_default();
        let overview = record.overview.or(record.description).unwrap_or_default();

        Self {
            id: record.id,
            slug: record.slug.unwrap_or_default(),
            title: record.title,
            company_name: record.company_name,
            location: record.location,
            job_type: record.job_type,
            job_status: record.job_status,
            overview,
            description,
            responsibilities: record.responsibilities.unwrap_or_default(),
            requirements: record.requirements.unwrap_or_default(),
            benefits: record.benefits.unwrap_or_default(),
            about_company: record.about_company.unwrap_or_default(),
            application_url: record.application_url,
            application_email: record.application_email,
            published_at: record.published_at,
            posted_on,
            created_at: record.created_at,
            updated_at: record.updated_at,
            salary_min: record.salary_min,
            salary_max: record.salary_max,
            salary_currency: record.salary_currency,
            tags: record.tags.unwrap_or_default(),
            poster_id: record.poster_id,
        }
    }

    pub fn is_published(&self) -> bool {
        self.job_status.is_published()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.poster_id == user_id
    }

    /// Format the salary range for display, e.g. "USD 90000 - 120000".
    pub fn salary_range(&self) -> Option<String> {
        let currency = self
            .salary_currency
            .as_deref()
            .map(|c| format!("{} ", c))
            .unwrap_or_default();
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => Some(format!("{}{} - {}", currency, min, max)),
            (Some(min), None) => Some(format!("{}{}+", currency, min)),
            (None, Some(max)) => Some(format!("up to {}{}", currency, max)),
            (None, None) => None,
        }
    }
}

impl From<JobRecord> for JobListing {
    fn from(record: JobRecord) -> Self {
        Self::from_record_at(record, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_json() -> serde_json::Value {
        serde_json::json!({
            "id": "7b0c6a52-8f1f-4a37-9d43-0b7f6f1f7d11",
            "slug": null,
            "title": "Frontend Engineer",
            "company_name": "Skyline Labs",
            "location": "Remote (US)",
            "job_type": "Full-Time",
            "job_status": "draft",
            "overview": null,
            "description": "Ship polished interfaces.",
            "responsibilities": null,
            "requirements": ["4+ years of React"],
            "benefits": null,
            "about_company": null,
            "application_url": null,
            "application_email": "jobs@skyline.test",
            "published_at": null,
            "created_at": "2024-06-01T10:00:00+00:00",
            "updated_at": "2024-06-02T10:00:00.123456+00:00",
            "poster_id": "user-1",
            "salary_min": 90000,
            "salary_max": null,
            "salary_currency": "USD",
            "tags": null,
            "metadata": null
        })
    }

    #[test]
    fn test_record_deserializes_rest_payload() {
        let record: JobRecord = serde_json::from_value(record_json()).unwrap();
        assert_eq!(record.job_type, JobType::FullTime);
        assert_eq!(record.job_status, JobStatus::Draft);
        assert_eq!(record.salary_min, Some(90000.0));
        assert!(record.slug.is_none());
    }

    #[test]
    fn test_listing_normalizes_nulls() {
        let record: JobRecord = serde_json::from_value(record_json()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let listing = JobListing::from_record_at(record, now);

        assert_eq!(listing.slug, "");
        assert_eq!(listing.overview, "Ship polished interfaces.");
        assert_eq!(listing.description, "Ship polished interfaces.");
        assert!(listing.responsibilities.is_empty());
        assert_eq!(listing.requirements, vec!["4+ years of React".to_string()]);
        assert!(listing.tags.is_empty());
        assert_eq!(listing.about_company, "");
        assert_eq!(listing.posted_on, "Draft, not yet published");
    }

    #[test]
    fn test_listing_serializes_camel_case() {
        let record: JobRecord = serde_json::from_value(record_json()).unwrap();
        let listing = JobListing::from(record);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["companyName"], "Skyline Labs");
        assert_eq!(json["jobType"], "Full-Time");
        assert_eq!(json["jobStatus"], "draft");
        assert!(json.get("company_name").is_none());
    }

    #[test]
    fn test_salary_range_formatting() {
        let record: JobRecord = serde_json::from_value(record_json()).unwrap();
        let mut listing = JobListing::from(record);
        assert_eq!(listing.salary_range().as_deref(), Some("USD 90000+"));
        listing.salary_max = Some(120000.0);
        assert_eq!(listing.salary_range().as_deref(), Some("USD 90000 - 120000"));
        listing.salary_min = None;
        listing.salary_max = None;
        assert_eq!(listing.salary_range(), None);
    }
}

//! Listing form state and the write payloads derived from it.
//!
//! A `ListingDraft` is what a poster edits. Saving it goes through three
//! steps: normalize (trim text, clean up lists), validate (required fields,
//! URL/email shape, salary range) and resolve the publish timestamp. The
//! result is a `ListingInput`, which maps onto the storage column names
//! through `ListingWrite`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::listing::JobListing;
use crate::slug::generate_slug;
use crate::status::{JobStatus, JobType};

/// Validation failure for a draft. No request is sent when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("; "))]
pub struct DraftValidationError {
    pub messages: Vec<String>,
}

impl From<ValidationErrors> for DraftValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        Self { messages }
    }
}

/// Editable listing fields, as entered in the create/edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "validate_salary_range"))]
pub struct ListingDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub job_type: JobType,
    pub job_status: JobStatus,
    pub overview: String,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub about_company: String,
    #[validate(url(message = "Application URL must be a valid URL"))]
    pub application_url: Option<String>,
    #[validate(email(message = "Application email must be a valid email address"))]
    pub application_email: Option<String>,
    #[validate(range(min = 0.0, message = "Minimum salary cannot be negative"))]
    pub salary_min: Option<f64>,
    #[validate(range(min = 0.0, message = "Maximum salary cannot be negative"))]
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub tags: Vec<String>,
    /// Explicit publish time chosen in the form
    pub published_at: Option<DateTime<Utc>>,
    /// Stamp the current time as publish time on save
    pub publish_immediately: bool,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            company_name: String::new(),
            location: String::new(),
            job_type: JobType::FullTime,
            job_status: JobStatus::Draft,
            overview: String::new(),
            description: String::new(),
            responsibilities: Vec::new(),
            requirements: Vec::new(),
            benefits: Vec::new(),
            about_company: String::new(),
            application_url: None,
            application_email: None,
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            tags: Vec::new(),
            published_at: None,
            publish_immediately: false,
        }
    }
}

fn validate_salary_range(draft: &ListingDraft) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (draft.salary_min, draft.salary_max) {
        if min > max {
            let mut err = ValidationError::new("salary_range");
            err.message = Some(Cow::from("Minimum salary cannot exceed maximum salary"));
            return Err(err);
        }
    }
    Ok(())
}

impl ListingDraft {
    /// Pre-fill the edit form from an existing listing.
    pub fn from_listing(listing: &JobListing) -> Self {
        Self {
            title: listing.title.clone(),
            company_name: listing.company_name.clone(),
            location: listing.location.clone(),
            job_type: listing.job_type,
            job_status: listing.job_status,
            overview: listing.overview.clone(),
            description: listing.description.clone(),
            responsibilities: listing.responsibilities.clone(),
            requirements: listing.requirements.clone(),
            benefits: listing.benefits.clone(),
            about_company: listing.about_company.clone(),
            application_url: listing.application_url.clone(),
            application_email: listing.application_email.clone(),
            salary_min: listing.salary_min,
            salary_max: listing.salary_max,
            salary_currency: listing.salary_currency.clone(),
            tags: listing.tags.clone(),
            published_at: listing.published_at,
            publish_immediately: false,
        }
    }

    /// Trim text fields and drop blank list entries and blank optionals.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            location: self.location.trim().to_string(),
            responsibilities: clean_list(self.responsibilities),
            requirements: clean_list(self.requirements),
            benefits: clean_list(self.benefits),
            application_url: non_blank(self.application_url),
            application_email: non_blank(self.application_email),
            salary_currency: non_blank(self.salary_currency),
            tags: clean_list(self.tags),
            ..self
        }
    }

    /// Validate a normalized copy without consuming the draft.
    pub fn check(&self) -> Result<(), DraftValidationError> {
        self.clone().normalized().validate()?;
        Ok(())
    }

    /// Normalize, validate and resolve the publish time.
    ///
    /// `previous_published_at` is the stored publish time of the listing
    /// being edited (`None` on create).
    pub fn prepare(
        self,
        previous_published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ListingInput, DraftValidationError> {
        let draft = self.normalized();
        draft.validate()?;

        let published_at = resolve_published_at(
            draft.job_status,
            draft.publish_immediately,
            draft.published_at,
            previous_published_at,
            now,
        );

        Ok(ListingInput {
            title: draft.title,
            company_name: draft.company_name,
            location: draft.location,
            job_type: draft.job_type,
            job_status: draft.job_status,
            overview: draft.overview,
            description: draft.description,
            responsibilities: draft.responsibilities,
            requirements: draft.requirements,
            benefits: draft.benefits,
            about_company: draft.about_company,
            application_url: draft.application_url,
            application_email: draft.application_email,
            salary_min: draft.salary_min,
            salary_max: draft.salary_max,
            salary_currency: draft.salary_currency,
            tags: draft.tags,
            published_at,
        })
    }
}

/// Decide the stored publish time for a save.
///
/// Non-published listings never carry a publish time. Published listings
/// take "now" when publishing immediately, otherwise the explicitly chosen
/// time, then the previously stored time, then "now".
pub fn resolve_published_at(
    status: JobStatus,
    publish_immediately: bool,
    requested: Option<DateTime<Utc>>,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !status.is_published() {
        return None;
    }
    if publish_immediately {
        return Some(now);
    }
    Some(requested.or(previous).unwrap_or(now))
}

/// A validated listing ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
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
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ListingInput {
    /// Translate to storage column names. Blank optional text becomes null.
    pub fn to_write(&self) -> ListingWrite {
        ListingWrite {
            title: self.title.clone(),
            company_name: self.company_name.clone(),
            location: self.location.clone(),
            job_type: self.job_type,
            job_status: self.job_status,
            overview: null_if_blank(Some(&self.overview)),
            description: null_if_blank(Some(&self.description)),
            responsibilities: self.responsibilities.clone(),
            requirements: self.requirements.clone(),
            benefits: self.benefits.clone(),
            about_company: null_if_blank(Some(&self.about_company)),
            application_url: null_if_blank(self.application_url.as_ref()),
            application_email: null_if_blank(self.application_email.as_ref()),
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            salary_currency: null_if_blank(self.salary_currency.as_ref()),
            tags: self.tags.clone(),
            published_at: self.published_at,
        }
    }

    /// Storage payload for a new listing owned by `poster_id`.
    pub fn to_new_write(&self, poster_id: impl Into<String>) -> NewListingWrite {
        NewListingWrite {
            fields: self.to_write(),
            poster_id: poster_id.into(),
            slug: generate_slug(&self.title),
        }
    }
}

/// Update payload in storage column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingWrite {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub job_status: JobStatus,
    pub overview: Option<String>,
    pub description: Option<String>,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub about_company: Option<String>,
    pub application_url: Option<String>,
    pub application_email: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Insert payload: the editable fields plus owner and slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListingWrite {
    #[serde(flatten)]
    pub fields: ListingWrite,
    pub poster_id: String,
    pub slug: String,
}

// -----------------------------------------------------------------------------
// Text helpers for form fields
// -----------------------------------------------------------------------------

/// One entry per non-blank line.
pub fn lines_to_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split tag text on commas, pipes or newlines.
pub fn csv_to_list(text: &str) -> Vec<String> {
    text.split([',', '|', '\n'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn list_to_csv(items: &[String]) -> String {
    items.join(", ")
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn null_if_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

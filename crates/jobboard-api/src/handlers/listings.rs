//! Public listing handlers.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use jobboard_models::{FilterOptions, JobListing, JobType, ListingFilters, ListingPage};

use crate::auth::MaybeAuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::state::AppState;

/// Query parameters shared by the listing pages.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub location: Option<String>,
    /// `Full-Time`, `Part-Time`, `Contract`, or `all`
    pub job_type: Option<String>,
    /// Restrict to the signed-in user's published listings
    #[serde(default)]
    pub mine: bool,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn filters(&self) -> ApiResult<ListingFilters> {
        let job_type = match self.job_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) if t.eq_ignore_ascii_case("all") => None,
            Some(t) => Some(
                t.parse::<JobType>()
                    .map_err(|e| ApiError::bad_request(e.to_string()))?,
            ),
        };
        Ok(ListingFilters {
            location: self.location.clone(),
            job_type,
            poster_id: None,
        })
    }
}

/// A page of listings plus paging hints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(flatten)]
    pub page: ListingPage,
    pub total_pages: u64,
    pub has_next: bool,
}

impl From<ListingPage> for PageResponse {
    fn from(page: ListingPage) -> Self {
        Self {
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub mine: bool,
}

/// The signed-in user's id when `mine` is requested.
fn poster_filter(mine: bool, user: MaybeAuthUser) -> ApiResult<Option<String>> {
    if !mine {
        return Ok(None);
    }
    match user.0 {
        Some(user) => Ok(Some(user.uid().to_string())),
        None => Err(ApiError::unauthorized("Sign in to see your listings")),
    }
}

/// Browse published listings.
pub async fn list_jobs(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageResponse>> {
    let mut filters = params.filters()?;
    filters.poster_id = poster_filter(params.mine, user)?;

    let page = state.board.browse(filters, params.page()).await?;
    Ok(Json(page.into()))
}

/// Filter drop-down values over published listings.
pub async fn list_filters(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Query(params): Query<FilterParams>,
) -> ApiResult<Json<FilterOptions>> {
    let poster_id = poster_filter(params.mine, user)?;
    Ok(Json(state.board.filter_options(poster_id).await?))
}

/// Slugs of every published listing.
pub async fn list_slugs(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.board.published_slugs().await?))
}

/// Published listing detail.
pub async fn get_job(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<JobListing>> {
    state
        .board
        .listing(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Listing {}", slug)))
}

//! Handlers for the signed-in user's own listings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use jobboard_client::BoardResult;
use jobboard_models::{FilterOptions, JobListing, ListingDraft};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::handlers::listings::{ListParams, PageResponse};
use crate::metrics;
use crate::state::AppState;

/// Count the mutation and pass its result through.
fn tracked<T>(op: &str, result: BoardResult<T>) -> BoardResult<T> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) if e.is_backend() => "backend_error",
        Err(_) => "rejected",
    };
    metrics::record_listing_mutation(op, outcome);
    result
}

/// The caller's listings in every status.
pub async fn my_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageResponse>> {
    let caller = user.caller();
    let page = state
        .board
        .my_listings(Some(&caller), params.filters()?, params.page())
        .await?;
    Ok(Json(page.into()))
}

/// Filter drop-down values over the caller's listings.
pub async fn my_filters(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<FilterOptions>> {
    let caller = user.caller();
    Ok(Json(state.board.my_filter_options(Some(&caller)).await?))
}

/// One of the caller's listings, any status.
pub async fn my_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<JobListing>> {
    let caller = user.caller();
    state
        .board
        .my_listing(Some(&caller), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Listing {}", slug)))
}

/// Create a listing owned by the caller.
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<ListingDraft>,
) -> ApiResult<(StatusCode, Json<JobListing>)> {
    let caller = user.caller();
    let listing = tracked("create", state.board.create_listing(Some(&caller), draft).await)?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Replace the caller's listing with the submitted form.
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(draft): Json<ListingDraft>,
) -> ApiResult<Json<JobListing>> {
    let caller = user.caller();
    let listing = tracked("update", state.board.update_listing(Some(&caller), &slug, draft).await)?;
    Ok(Json(listing))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// Delete the caller's listing. Requires `confirm=true`.
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    if !params.confirm {
        return Err(ApiError::bad_request(
            "Deleting a listing cannot be undone; repeat the request with confirm=true",
        ));
    }

    let caller = user.caller();
    tracked("delete", state.board.delete_listing(Some(&caller), &slug).await)?;
    info!(slug = %slug, uid = %user.uid(), "Listing deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

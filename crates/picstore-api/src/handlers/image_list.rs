use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use picstore_core::models::MediaRecord;
use serde::Deserialize;

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Exact (case-sensitive) tag to filter by.
    pub tag: Option<String>,
}

/// List the caller's images, optionally filtered by tag.
///
/// Every record carries a freshly signed access URL; records are returned in
/// the storage backend's listing order. An owner with no images gets a 404
/// with code `NO_IMAGES_FOUND`; a tag matching nothing gets `NO_MATCHING_TAG`.
#[utoipa::path(
    get,
    path = "/api/v0/images",
    tag = "images",
    params(ListQuery),
    responses(
        (status = 200, description = "List of images", body = Vec<MediaRecord>),
        (status = 404, description = "No images, or no images with this tag", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, query),
    fields(
        owner = %auth.username,
        tag = ?query.tag,
        operation = "list_images"
    )
)]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = match query.tag.as_deref() {
        Some(tag) if !tag.is_empty() => state.media.get_images_by_tag(&auth.username, tag).await?,
        _ => state.media.get_images_by_owner(&auth.username).await?,
    };

    Ok(Json(records))
}

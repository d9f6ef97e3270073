use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use picstore_core::models::SuggestTagsResponse;

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::spool_multipart;
use crate::validation::UploadLimits;

/// Suggest tags for an image without storing it.
///
/// The image is spooled locally, handed to the suggestion provider, and the
/// provider's ranked keywords are returned verbatim.
#[utoipa::path(
    post,
    path = "/api/v0/images/suggest-tags",
    tag = "images",
    responses(
        (status = 200, description = "Suggested tags", body = SuggestTagsResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Suggestion service failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(
        owner = %auth.username,
        operation = "suggest_tags"
    )
)]
pub async fn suggest_tags(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let limits = UploadLimits::from_config(&state.config);
    let upload = spool_multipart(multipart, &limits).await?;

    let tags = state.media.suggest_tags(upload.temp_file.path()).await?;

    Ok(Json(SuggestTagsResponse { tags }))
}

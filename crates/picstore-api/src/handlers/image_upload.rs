use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use picstore_core::models::UploadResponse;

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::spool_multipart;
use crate::validation::{validate_tag_count, UploadLimits};

/// Upload an image with up to 3 tags.
///
/// Expects a multipart body with one `file` part and any number of `tags`
/// text parts. The authenticated caller becomes the owner; the owner can
/// never be chosen by the client.
#[utoipa::path(
    post,
    path = "/api/v0/images",
    tag = "images",
    responses(
        (status = 201, description = "Image uploaded", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(
        owner = %auth.username,
        operation = "upload_image"
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let limits = UploadLimits::from_config(&state.config);
    let upload = spool_multipart(multipart, &limits).await?;
    validate_tag_count(&upload.tags).map_err(HttpAppError::from)?;

    tracing::debug!(
        size_bytes = upload.size,
        content_type = %upload.content_type,
        tags = upload.tags.len(),
        "Upload spooled"
    );

    let media_id = state
        .media
        .add_image(
            &auth.username,
            upload.temp_file.path(),
            &upload.extension,
            &upload.tags,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { media_id })))
}

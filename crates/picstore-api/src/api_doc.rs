//! OpenAPI document aggregation.

use utoipa::OpenApi;

use picstore_core::models::{MediaRecord, SuggestTagsResponse, UploadResponse};

use crate::error::ErrorResponse;
use crate::handlers::auth::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse};
use crate::handlers::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::image_upload::upload_image,
        crate::handlers::image_list::list_images,
        crate::handlers::suggest_tags::suggest_tags,
    ),
    components(schemas(
        MediaRecord,
        UploadResponse,
        SuggestTagsResponse,
        ErrorResponse,
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        TokenResponse,
        HealthResponse,
    )),
    tags(
        (name = "images", description = "Image upload, listing, and tag suggestion"),
        (name = "auth", description = "Registration and token issuance"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

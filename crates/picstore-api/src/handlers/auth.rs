use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::jwt;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Bearer token to send on subsequent requests.
    pub token: String,
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/api/v0/auth/register",
    tag = "auth",
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid username or password", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "register"))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .users
        .register(&request.username, &request.password)
        .await
        .map_err(HttpAppError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: request.username,
        }),
    ))
}

/// Exchange credentials for a signed bearer token.
#[utoipa::path(
    post,
    path = "/api/v0/auth/login",
    tag = "auth",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "login"))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let admin = state
        .users
        .verify(&request.username, &request.password)
        .await
        .map_err(HttpAppError::from)?;

    let token = jwt::issue_token(
        &request.username,
        admin,
        state.config.jwt_secret(),
        state.config.jwt_expiry_hours(),
    )
    .map_err(HttpAppError::from)?;

    Ok(Json(TokenResponse { token }))
}

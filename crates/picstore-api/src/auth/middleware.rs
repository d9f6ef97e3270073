use crate::auth::jwt::decode_token;
use crate::auth::models::AuthContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use picstore_core::AppError;
use std::sync::Arc;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

/// Verify the bearer token and inject an [`AuthContext`] into the request.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match decode_token(token, &auth_state.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthContext {
                username: claims.sub,
                admin: claims.admin,
            });
            next.run(request).await
        }
        Err(err) => HttpAppError(err).into_response(),
    }
}

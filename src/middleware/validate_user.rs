use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{User, UserRole};
use crate::AppState;

/// The caller's user record, loaded fresh from the store on every request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Loads the user named by the token. A token for a user that no longer exists is rejected.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.store.find_user(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!("Token presented for unknown user {}", auth_user.user_id);
        ApiError::unauthorized("Invalid token. User not found.")
    })?;

    tracing::debug!("Authenticated {} ({})", user.username, user.id);
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Gate for project and document routes.
pub async fn require_verified_email(request: Request, next: Next) -> Result<Response, ApiError> {
    let verified = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|CurrentUser(user)| user.is_email_verified);

    if !verified {
        return Err(ApiError::forbidden(
            "Please verify your email address to access this feature",
        ));
    }
    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|CurrentUser(user)| user.role == UserRole::Administrator);

    if !is_admin {
        tracing::warn!("Non-administrator attempted an admin route");
        return Err(ApiError::forbidden("Administrator access required"));
    }
    Ok(next.run(request).await)
}

// handlers/public/auth/verify.rs - Email verification endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::api::format::UserProfile;
use crate::auth::generate_single_use_token;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::verification_email;
use crate::AppState;

/// GET /api/auth/verify-email/:token - consume a verification token
pub async fn verify_email_get(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<UserProfile> {
    let invalid = || ApiError::bad_request("Invalid or expired verification token");

    let mut user = state
        .store
        .find_user_by_verification_token(&token)
        .await?
        .ok_or_else(invalid)?;

    if !user.verify_email(&token, Utc::now()) {
        tracing::warn!("Expired verification token presented for {}", user.id);
        return Err(invalid());
    }

    state.store.update_user(&user).await?;
    tracing::info!("Email verified for {}", user.id);

    Ok(ApiResponse::success(UserProfile::from(&user))
        .with_message("Email verified successfully! You can now log in."))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendRequest {
    pub email: String,
}

/// POST /api/auth/resend-verification - issue a fresh verification token
pub async fn resend_verification_post(
    State(state): State<AppState>,
    Json(body): Json<ResendRequest>,
) -> ApiResult<()> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }

    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("No account found with this email address"))?;

    if user.is_email_verified {
        return Err(ApiError::bad_request("Email is already verified"));
    }

    let now = Utc::now();
    let token = generate_single_use_token();
    user.email_verification_token = Some(token.clone());
    user.email_verification_expires =
        Some(now + Duration::hours(state.config.security.verification_token_hours as i64));
    user.updated_at = now;
    state.store.update_user(&user).await?;

    state
        .mailer
        .send(verification_email(&state.config.email.frontend_url, &user.email, &token))
        .await?;

    Ok(ApiResponse::message("Verification email sent. Please check your inbox."))
}

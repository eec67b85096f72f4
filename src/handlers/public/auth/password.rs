// handlers/public/auth/password.rs - Password reset endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::auth::{generate_single_use_token, hash_password};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::password_reset_email;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /api/auth/forgot-password - mail a reset link valid for the configured window
pub async fn forgot_password_post(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    let email = body.email.trim().to_lowercase();
    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("No account found with this email address"))?;

    let token = generate_single_use_token();
    user.reset_password_token = Some(token.clone());
    user.reset_password_expires =
        Some(Utc::now() + Duration::minutes(state.config.security.reset_token_minutes as i64));
    state.store.update_user(&user).await?;

    let mail = password_reset_email(&state.config.email.frontend_url, &user.email, &token);
    if let Err(e) = state.mailer.send(mail).await {
        tracing::error!("Password reset email to {} failed: {}", user.email, e);
        user.clear_reset_token();
        state.store.update_user(&user).await?;
        return Err(ApiError::internal_with_details(
            "Failed to send password reset email. Please try again.",
            e,
        ));
    }

    Ok(ApiResponse::message("Password reset email sent. Please check your inbox."))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// POST /api/auth/reset-password/:token - replace the password and consume the token
pub async fn reset_password_post(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    if body.new_password.chars().count() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters long"));
    }

    let now = Utc::now();
    let mut user = state
        .store
        .find_user_by_reset_token(&token)
        .await?
        .filter(|u| u.reset_password_expires.is_some_and(|exp| exp > now))
        .ok_or_else(|| ApiError::bad_request("Invalid or expired password reset token"))?;

    user.password_hash = hash_password(&body.new_password)?;
    user.clear_reset_token();
    user.updated_at = now;
    state.store.update_user(&user).await?;
    tracing::info!("Password reset for {}", user.id);

    Ok(ApiResponse::message(
        "Password reset successful! You can now log in with your new password.",
    ))
}

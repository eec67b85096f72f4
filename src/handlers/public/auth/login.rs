// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::format::UserProfile;
use crate::api::params::Validator;
use crate::auth::{generate_jwt, verify_password, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/**
 * POST /api/auth/login - Exchange credentials for a session token
 *
 * Unknown email and wrong password produce the same 401. Unverified accounts are refused
 * until the verification link has been followed.
 */
pub async fn login_post(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let email = body.email.trim().to_lowercase();
    Validator::new()
        .check(!email.is_empty(), "Email is required")
        .check(!body.password.is_empty(), "Password is required")
        .finish()?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(invalid());
    };

    if !verify_password(&body.password, &user.password_hash)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    if !user.is_email_verified {
        return Err(ApiError::unauthorized("Please verify your email before logging in"));
    }

    let claims = Claims::new(user.id, state.config.security.session_token_hours);
    let token = generate_jwt(&claims, &state.config.security.jwt_secret)?;
    tracing::info!("User {} logged in", user.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        user: UserProfile::from(&user),
    })
    .with_message("Login successful"))
}

// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::params::{is_valid_email, Validator};
use crate::auth::{generate_single_use_token, hash_password};
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{User, UserRole};
use crate::services::verification_email;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub affiliation: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_email_verified: bool,
}

/// Roles open to self-registration. Administrators are only ever provisioned directly.
fn self_assignable_role(raw: Option<&str>) -> Option<UserRole> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Some(UserRole::Researcher),
        Some(r) => match r.parse() {
            Ok(role @ (UserRole::Researcher | UserRole::AcademicManager)) => Some(role),
            _ => None,
        },
    }
}

/**
 * POST /api/auth/register - Create an unverified account and send the verification link
 *
 * Input: { "username", "email", "password", "affiliation", "role"? }
 * Output: 201 with { userId, username, email, role, isEmailVerified: false }
 */
pub async fn register_post(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> ApiResult<Registered> {
    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_string();
    let role = self_assignable_role(body.role.as_deref());

    Validator::new()
        .min_len(&username, 3, "Username must be at least 3 characters long")
        .check(is_valid_email(&email), "Please provide a valid email address")
        .check(body.password.chars().count() >= 6, "Password must be at least 6 characters long")
        .min_len(&body.affiliation, 2, "Affiliation must be at least 2 characters long")
        .check(role.is_some(), "Role must be either researcher or academic_manager")
        .finish()?;

    let now = Utc::now();
    let token = generate_single_use_token();
    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        password_hash: hash_password(&body.password)?,
        affiliation: body.affiliation.trim().to_string(),
        role: role.unwrap_or(UserRole::Researcher),
        is_email_verified: false,
        email_verification_token: Some(token.clone()),
        email_verification_expires: Some(now + Duration::hours(state.config.security.verification_token_hours as i64)),
        reset_password_token: None,
        reset_password_expires: None,
        created_at: now,
        updated_at: now,
    };

    // Conflict on a taken email or username surfaces as a 400
    state.store.create_user(&user).await?;
    tracing::info!("Registered user {} ({})", user.username, user.id);

    let mail = verification_email(&state.config.email.frontend_url, &user.email, &token);
    if let Err(e) = state.mailer.send(mail).await {
        tracing::error!("Verification email to {} failed: {}", user.email, e);
    }

    Ok(ApiResponse::created(Registered {
        user_id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        is_email_verified: false,
    })
    .with_message("Registration successful! Please check your email to verify your account."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrators_cannot_self_register() {
        assert_eq!(self_assignable_role(None), Some(UserRole::Researcher));
        assert_eq!(self_assignable_role(Some("academic_manager")), Some(UserRole::AcademicManager));
        assert_eq!(self_assignable_role(Some("administrator")), None);
        assert_eq!(self_assignable_role(Some("wizard")), None);
    }
}

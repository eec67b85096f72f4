// handlers/protected/user.rs - /api/user/* handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::format::UserProfile;
use crate::api::params::{non_empty, Validator};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{UserRole, UserSummary};
use crate::AppState;

/// GET /api/user/profile
pub async fn profile_get(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<UserProfile> {
    Ok(ApiResponse::success(UserProfile::from(&user)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub affiliation: Option<String>,
}

/// PUT /api/user/profile - username and affiliation only; email and role are fixed
pub async fn profile_put(
    State(state): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let username = body.username.map(|u| u.trim().to_string());
    let affiliation = body.affiliation.map(|a| a.trim().to_string());

    let mut validator = Validator::new();
    if let Some(u) = &username {
        validator.min_len(u, 3, "Username must be at least 3 characters long");
    }
    if let Some(a) = &affiliation {
        validator.min_len(a, 2, "Affiliation must be at least 2 characters long");
    }
    validator.finish()?;

    if let Some(u) = username {
        user.username = u;
    }
    if let Some(a) = affiliation {
        user.affiliation = a;
    }
    user.updated_at = Utc::now();

    // A taken username comes back as a 400 conflict
    state.store.update_user(&user).await?;
    tracing::info!("Profile updated for {}", user.id);

    Ok(ApiResponse::success(UserProfile::from(&user)).with_message("Profile updated successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: u64,
    pub total_documents: u64,
    pub total_collaborations: u64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: UserSummary,
    pub stats: DashboardStats,
}

/// GET /api/user/dashboard
pub async fn dashboard_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Dashboard> {
    let counts = state.store.dashboard_counts(user.id).await?;
    Ok(ApiResponse::success(Dashboard {
        user: user.summary(),
        stats: DashboardStats {
            total_projects: counts.projects,
            total_documents: counts.documents,
            total_collaborations: counts.collaborations,
        },
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckStatusParams {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub affiliation: String,
    pub is_email_verified: bool,
    pub can_be_added_to_project: bool,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserStatusResponse {
    pub user: UserStatus,
}

/// GET /api/user/check-status?email= - lets a project manager check an invitee before adding them
pub async fn check_status_get(
    State(state): State<AppState>,
    Query(params): Query<CheckStatusParams>,
) -> ApiResult<UserStatusResponse> {
    let email = non_empty(params.email)
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Email parameter is required"))?;

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(UserStatusResponse {
        user: UserStatus {
            username: user.username,
            email: user.email,
            role: user.role,
            affiliation: user.affiliation,
            is_email_verified: user.is_email_verified,
            can_be_added_to_project: user.is_email_verified,
            member_since: user.created_at,
        },
    }))
}

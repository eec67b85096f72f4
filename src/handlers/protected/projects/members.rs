// handlers/protected/projects/members.rs - Membership endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::access::{add_member, has_capability, request_self_join, Capability, MembershipError, PermissionOverrides, ProjectRole};
use crate::api::format::{MemberView, UserDirectory};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::utils::{denied, load_project, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::Member;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Option<String>,
    pub permissions: Option<PermissionOverrides>,
}

#[derive(Debug, Serialize)]
pub struct MemberAdded {
    pub member: MemberView,
}

/// A concurrent insert of the same user loses at the store's uniqueness check.
fn duplicate_as(err: DatabaseError, duplicate: MembershipError) -> ApiError {
    match err {
        DatabaseError::Conflict(_) => duplicate.into(),
        other => other.into(),
    }
}

async fn member_view(state: &AppState, member: Member) -> Result<MemberView, ApiError> {
    let users = UserDirectory::load(state.store.as_ref(), [member.user_id]).await?;
    Ok(MemberView {
        user: users.get(member.user_id),
        role: member.role,
        permissions: member.permissions,
        joined_at: member.joined_at,
    })
}

/**
 * POST /api/projects/:id/members - Add a verified user by email
 *
 * Requires `canManageMembers`. An unrecognized role falls back to collaborator. Explicit
 * permission flags override the role's default row; flags left out keep the row's value.
 */
pub async fn member_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<MemberAdded> {
    let mut project = load_project(state.store.as_ref(), parse_id(&id, "project")?).await?;

    if !has_capability(&project, user.id, Capability::ManageMembers) {
        return Err(denied(user.id, "manage project members", "Permission denied"));
    }

    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    let target = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found with this email address"))?;

    let role = body
        .role
        .as_deref()
        .map(ProjectRole::parse_or_default)
        .unwrap_or(ProjectRole::Collaborator);

    let permissions = body.permissions.map(|p| p.over(role.default_permissions()));
    let member = add_member(&mut project, &target, role, permissions, Utc::now())?;
    state
        .store
        .insert_member(project.id, &member)
        .await
        .map_err(|e| duplicate_as(e, MembershipError::DuplicateMember))?;
    tracing::info!("User {} added to project {} as {} by {}", target.id, project.id, role, user.id);

    let member = member_view(&state, member).await?;
    Ok(ApiResponse::success(MemberAdded { member }).with_message("Member added successfully"))
}

/// POST /api/projects/:id/join - self-service join of a public project as collaborator
pub async fn join_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<MemberAdded> {
    let mut project = load_project(state.store.as_ref(), parse_id(&id, "project")?).await?;

    let member = request_self_join(&mut project, user.id, Utc::now())?;
    state
        .store
        .insert_member(project.id, &member)
        .await
        .map_err(|e| duplicate_as(e, MembershipError::AlreadyMember))?;
    tracing::info!("User {} joined project {}", user.id, project.id);

    let member = member_view(&state, member).await?;
    Ok(ApiResponse::success(MemberAdded { member }).with_message("Successfully joined the project"))
}

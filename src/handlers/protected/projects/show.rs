// handlers/protected/projects/show.rs - GET /api/projects/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::access::can_view_project;
use crate::api::format::{project_user_ids, ProjectView, UserDirectory};
use crate::handlers::utils::{denied, load_project, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::AppState;

/// Visible to the creator, any member, and anyone when the project is public. Non-members
/// see themselves as `viewer`.
pub async fn project_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ProjectView> {
    let project = load_project(state.store.as_ref(), parse_id(&id, "project")?).await?;

    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "view private project", "Access denied"));
    }

    let users = UserDirectory::load(state.store.as_ref(), project_user_ids(&project)).await?;
    Ok(ApiResponse::success(ProjectView::for_viewer(&project, &users, user.id)))
}

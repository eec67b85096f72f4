// handlers/protected/forums/forums.rs - Forums of a project

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::access::{can_view_project, is_member_or_creator};
use crate::api::format::{ForumView, UserDirectory};
use crate::error::ApiError;
use crate::handlers::utils::{denied, load_project, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::Forum;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateForumRequest {
    pub title: String,
    pub description: String,
}

/// POST /api/forums/project/:project_id - the creator becomes the first moderator
pub async fn forum_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Json(body): Json<CreateForumRequest>,
) -> ApiResult<ForumView> {
    let (title, description) = (body.title.trim(), body.description.trim());
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::bad_request("Title and description are required"));
    }

    let project = load_project(state.store.as_ref(), parse_id(&project_id, "project")?).await?;
    if !is_member_or_creator(&project, user.id) {
        return Err(denied(user.id, "create forum", "Access denied"));
    }

    let forum = Forum::create(title.to_string(), description.to_string(), project.id, user.id, Utc::now());
    state.store.create_forum(&forum).await?;
    tracing::info!("Forum {} created in project {} by {}", forum.id, project.id, user.id);

    let users = UserDirectory::load(state.store.as_ref(), forum.moderators.iter().copied()).await?;
    Ok(ApiResponse::created(ForumView::new(&forum, &users)).with_message("Forum created successfully"))
}

/// GET /api/forums/project/:project_id - active forums, oldest first
pub async fn forums_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
) -> ApiResult<Vec<ForumView>> {
    let project = load_project(state.store.as_ref(), parse_id(&project_id, "project")?).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "list forums", "Access denied"));
    }

    let forums = state.store.list_forums(project.id).await?;
    let users = UserDirectory::load(
        state.store.as_ref(),
        forums
            .iter()
            .flat_map(|f| std::iter::once(f.created_by).chain(f.moderators.iter().copied())),
    )
    .await?;

    Ok(ApiResponse::success(forums.iter().map(|f| ForumView::new(f, &users)).collect()))
}

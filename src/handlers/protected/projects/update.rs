// handlers/protected/projects/update.rs - PUT /api/projects/:id handler

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::TimelineInput;
use crate::access::{has_capability, Capability};
use crate::api::format::{project_user_ids, ProjectView, UserDirectory};
use crate::api::params::{non_blank, Validator};
use crate::handlers::utils::{denied, load_project, parse_id, parse_optional};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{Deliverable, ProjectCategory, ProjectStatus, Task};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goals: Option<Vec<String>>,
    pub objectives: Option<Vec<String>>,
    pub deliverables: Option<Vec<Deliverable>>,
    pub tasks: Option<Vec<Task>>,
    pub timeline: Option<TimelineInput>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/**
 * PUT /api/projects/:id - Partial update of the project's own fields
 *
 * Requires `canEdit`. Membership is never touched here; deliverables and tasks are replaced
 * wholesale when present. Any status may move to any other status.
 */
pub async fn project_put(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectView> {
    let mut project = load_project(state.store.as_ref(), parse_id(&id, "project")?).await?;

    if !has_capability(&project, user.id, Capability::Edit) {
        return Err(denied(user.id, "edit project", "Permission denied"));
    }

    let goals = body.goals.map(non_blank);
    let objectives = body.objectives.map(non_blank);

    let mut validator = Validator::new();
    if let Some(title) = &body.title {
        validator.min_len(title, 3, "Project title must be at least 3 characters long");
    }
    if let Some(description) = &body.description {
        validator.min_len(description, 10, "Project description must be at least 10 characters long");
    }
    if let Some(goals) = &goals {
        validator.check(!goals.is_empty(), "At least one goal is required");
    }
    if let Some(objectives) = &objectives {
        validator.check(!objectives.is_empty(), "At least one objective is required");
    }
    let timeline = body.timeline.as_ref().and_then(|t| t.validate(&mut validator));
    let status = parse_optional::<ProjectStatus>(body.status.as_deref()).unwrap_or_else(|e| {
        validator.check(false, e.message());
        None
    });
    let category = parse_optional::<ProjectCategory>(body.category.as_deref()).unwrap_or_else(|e| {
        validator.check(false, e.message());
        None
    });
    validator.finish()?;

    if let Some(title) = body.title {
        project.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        project.description = description.trim().to_string();
    }
    if let Some(goals) = goals {
        project.goals = goals;
    }
    if let Some(objectives) = objectives {
        project.objectives = objectives;
    }
    if let Some(deliverables) = body.deliverables {
        project.deliverables = deliverables;
    }
    if let Some(tasks) = body.tasks {
        project.tasks = tasks;
    }
    if let Some(timeline) = timeline {
        project.timeline = timeline;
    }
    if let Some(status) = status {
        project.status = status;
    }
    if let Some(category) = category {
        project.category = category;
    }
    if let Some(is_public) = body.is_public {
        project.is_public = is_public;
    }
    if let Some(tags) = body.tags {
        project.tags = non_blank(tags);
    }
    project.updated_at = Utc::now();

    state.store.update_project(&project).await?;
    tracing::info!("Project {} updated by {}", project.id, user.id);

    let users = UserDirectory::load(state.store.as_ref(), project_user_ids(&project)).await?;
    Ok(ApiResponse::success(ProjectView::for_viewer(&project, &users, user.id))
        .with_message("Project updated successfully"))
}

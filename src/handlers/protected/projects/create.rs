// handlers/protected/projects/create.rs - POST /api/projects handler

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use super::TimelineInput;
use crate::api::format::{project_user_ids, ProjectView, UserDirectory};
use crate::api::params::{non_blank, Validator};
use crate::error::ApiError;
use crate::handlers::utils::parse_optional;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{Deliverable, NewProject, Project, ProjectCategory};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    pub goals: Vec<String>,
    pub objectives: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub timeline: TimelineInput,
    pub category: Option<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
}

/**
 * POST /api/projects - Create a project owned by the caller
 *
 * Blank goals and objectives are dropped before the "at least one" check. The creator is
 * enrolled as project manager with every capability; the project starts in `planning`.
 */
pub async fn project_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<ProjectView> {
    let goals = non_blank(body.goals);
    let objectives = non_blank(body.objectives);

    let mut validator = Validator::new();
    validator
        .min_len(&body.title, 3, "Project title must be at least 3 characters long")
        .min_len(&body.description, 10, "Project description must be at least 10 characters long")
        .check(!goals.is_empty(), "At least one goal is required")
        .check(!objectives.is_empty(), "At least one objective is required");
    let timeline = body.timeline.validate(&mut validator);
    let category = parse_optional::<ProjectCategory>(body.category.as_deref()).unwrap_or_else(|e| {
        validator.check(false, e.message());
        None
    });
    validator.finish()?;

    let Some(timeline) = timeline else {
        return Err(ApiError::bad_request("Project timeline is required"));
    };

    let project = Project::create(
        NewProject {
            title: body.title.trim().to_string(),
            description: body.description.trim().to_string(),
            goals,
            objectives,
            deliverables: body.deliverables,
            timeline,
            category: category.unwrap_or(ProjectCategory::Research),
            is_public: body.is_public,
            tags: non_blank(body.tags),
        },
        user.id,
        Utc::now(),
    );

    state.store.create_project(&project).await?;
    tracing::info!("Project {} created by {}", project.id, user.id);

    let users = UserDirectory::load(state.store.as_ref(), project_user_ids(&project)).await?;
    Ok(ApiResponse::created(ProjectView::for_viewer(&project, &users, user.id))
        .with_message("Project created successfully"))
}

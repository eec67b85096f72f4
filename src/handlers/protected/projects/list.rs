// handlers/protected/projects/list.rs - GET /api/projects handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::format::{project_user_ids, ProjectView, UserDirectory};
use crate::database::store::ProjectQuery;
use crate::database::{PageInfo, Pagination};
use crate::handlers::utils::parse_optional;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectView>,
    pub pagination: PageInfo,
}

/// Projects the caller created or belongs to, most recently updated first.
pub async fn projects_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<ProjectListParams>,
) -> ApiResult<ProjectList> {
    let api = &state.config.api;
    let pagination = Pagination::new(params.page, params.limit, api.default_page_size, api.max_page_size);
    let query = ProjectQuery {
        user_id: user.id,
        status: parse_optional(params.status.as_deref())?,
        category: parse_optional(params.category.as_deref())?,
        pagination,
    };

    let page = state.store.list_projects_for_user(&query).await?;
    let users = UserDirectory::load(state.store.as_ref(), page.items.iter().flat_map(project_user_ids)).await?;

    Ok(ApiResponse::success(ProjectList {
        projects: page
            .items
            .iter()
            .map(|p| ProjectView::for_viewer(p, &users, user.id))
            .collect(),
        pagination: PageInfo::new(pagination, page.total),
    }))
}

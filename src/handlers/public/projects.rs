// handlers/public/projects.rs - GET /api/projects/public handler

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::api::format::{project_user_ids, ProjectView, UserDirectory};
use crate::api::params::non_empty;
use crate::database::store::PublicProjectQuery;
use crate::database::{PageInfo, Pagination};
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PublicProjectParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectView>,
    pub pagination: PageInfo,
}

/// Public catalogue. The search term is matched literally against the configured fields.
pub async fn public_projects_get(
    State(state): State<AppState>,
    Query(params): Query<PublicProjectParams>,
) -> ApiResult<ProjectList> {
    let api = &state.config.api;
    let pagination = Pagination::new(params.page, params.limit, api.default_page_size, api.max_page_size);
    let query = PublicProjectQuery {
        search: non_empty(params.search),
        fields: state.config.search.clone(),
        pagination,
    };

    let page = state.store.list_public_projects(&query).await?;
    let users = UserDirectory::load(state.store.as_ref(), page.items.iter().flat_map(project_user_ids)).await?;

    Ok(ApiResponse::success(ProjectList {
        projects: page.items.iter().map(|p| ProjectView::new(p, &users)).collect(),
        pagination: PageInfo::new(pagination, page.total),
    }))
}

// handlers/protected/documents/list.rs - Project document listings

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};

use super::can_list;
use crate::access::{has_capability, Capability};
use crate::api::format::{document_user_ids, DocumentView, UserDirectory};
use crate::api::params::non_empty;
use crate::database::store::DocumentQuery;
use crate::database::{PageInfo, Pagination};
use crate::handlers::utils::{denied, load_project, parse_id, parse_optional};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::DocumentStatus;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentView>,
    pub pagination: PageInfo,
}

async fn list(
    state: &AppState,
    params: DocumentListParams,
    query: impl FnOnce(Pagination) -> DocumentQuery,
) -> ApiResult<DocumentList> {
    let api = &state.config.api;
    let pagination = Pagination::new(params.page, params.limit, api.default_page_size, api.max_page_size);
    let query = query(pagination);

    let page = state.store.list_documents(&query).await?;
    let users = UserDirectory::load(state.store.as_ref(), page.items.iter().flat_map(document_user_ids)).await?;

    Ok(ApiResponse::success(DocumentList {
        documents: page.items.iter().map(|d| DocumentView::new(d, &users)).collect(),
        pagination: PageInfo::new(pagination, page.total),
    }))
}

/// GET /api/documents/project/:project_id - active documents, newest first
pub async fn documents_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Query(params): Query<DocumentListParams>,
) -> ApiResult<DocumentList> {
    let project = load_project(state.store.as_ref(), parse_id(&project_id, "project")?).await?;

    if !can_list(&project, user.id) {
        return Err(denied(
            user.id,
            "list documents",
            "You do not have permission to view documents in this project",
        ));
    }

    let category = parse_optional(params.category.as_deref())?;
    let search = non_empty(params.search.clone());
    list(&state, params, |pagination| DocumentQuery {
        project_id: project.id,
        status: DocumentStatus::Active,
        category,
        search,
        pagination,
    })
    .await
}

/// GET /api/documents/project/:project_id/deleted - the restore bin
pub async fn deleted_documents_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    Query(params): Query<DocumentListParams>,
) -> ApiResult<DocumentList> {
    let project = load_project(state.store.as_ref(), parse_id(&project_id, "project")?).await?;

    if !has_capability(&project, user.id, Capability::Edit) {
        return Err(denied(
            user.id,
            "list deleted documents",
            "Only members with edit permission can view deleted documents",
        ));
    }

    list(&state, params, |pagination| DocumentQuery {
        project_id: project.id,
        status: DocumentStatus::Deleted,
        category: None,
        search: None,
        pagination,
    })
    .await
}

// handlers/protected/documents/show.rs - GET /api/documents/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};

use super::{can_manage, can_read, document_view};
use crate::api::format::DocumentView;
use crate::error::ApiError;
use crate::handlers::utils::{denied, load_document, load_project, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::AppState;

/// Document details. Non-active documents are only visible to those who could restore them.
pub async fn document_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<DocumentView> {
    let document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;
    let project = load_project(state.store.as_ref(), document.project_id).await?;

    if !document.is_active() && !can_manage(&document, &project, user.id) {
        return Err(ApiError::not_found("Document not available"));
    }
    if !can_read(&document, &project, user.id) {
        return Err(denied(user.id, "view document", "You do not have permission to view this document"));
    }

    Ok(ApiResponse::success(document_view(&state, &document).await?))
}

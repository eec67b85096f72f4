// handlers/protected/documents/delete.rs - Soft/hard delete and restore

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use super::{can_manage, document_view};
use crate::api::format::DocumentView;
use crate::error::ApiError;
use crate::handlers::utils::{denied, load_document, load_project, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::DocumentStatus;
use crate::services::StorageError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub hard_delete: Option<String>,
}

/**
 * DELETE /api/documents/:id?hardDelete=true|false
 *
 * Soft delete flips the status and keeps everything for restore. Hard delete removes the file
 * of every version, then the record.
 */
pub async fn document_delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<()> {
    let mut document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;
    let project = load_project(state.store.as_ref(), document.project_id).await?;

    if !can_manage(&document, &project, user.id) {
        return Err(denied(
            user.id,
            "delete document",
            "You can only delete your own documents or documents in projects you can edit",
        ));
    }

    if params.hard_delete.as_deref() == Some("true") {
        for path in document.stored_paths() {
            match state.files.delete(path).await {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => tracing::error!("Failed to remove {} for document {}: {}", path, document.id, e),
            }
        }
        state.store.delete_document(document.id).await?;
        tracing::info!("Document {} permanently deleted by {}", document.id, user.id);
        return Ok(ApiResponse::message("Document permanently deleted"));
    }

    document.status = DocumentStatus::Deleted;
    document.updated_at = Utc::now();
    state.store.update_document(&document).await?;
    tracing::info!("Document {} soft deleted by {}", document.id, user.id);

    Ok(ApiResponse::message("Document deleted successfully"))
}

/// PATCH /api/documents/:id/restore - only from `deleted`
pub async fn restore_patch(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<DocumentView> {
    let mut document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;
    let project = load_project(state.store.as_ref(), document.project_id).await?;

    if !can_manage(&document, &project, user.id) {
        return Err(denied(user.id, "restore document", "You can only restore your own documents"));
    }
    if document.status != DocumentStatus::Deleted {
        return Err(ApiError::bad_request("Document is not deleted"));
    }

    document.status = DocumentStatus::Active;
    document.updated_at = Utc::now();
    state.store.update_document(&document).await?;
    tracing::info!("Document {} restored by {}", document.id, user.id);

    Ok(ApiResponse::success(document_view(&state, &document).await?).with_message("Document restored successfully"))
}

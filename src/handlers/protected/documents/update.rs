// handlers/protected/documents/update.rs - Metadata and ACL updates

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{can_manage, document_view};
use crate::access::DocumentPermission;
use crate::api::format::DocumentView;
use crate::api::params::Validator;
use crate::error::ApiError;
use crate::handlers::utils::{denied, load_document, load_project, parse_id, parse_optional, TagsInput};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{DocumentCategory, DocumentGrant};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<TagsInput>,
    pub is_public: Option<bool>,
}

/// PUT /api/documents/:id - owner or project `canEdit`; active documents only
pub async fn document_put(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDocumentRequest>,
) -> ApiResult<DocumentView> {
    let mut document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;
    if !document.is_active() {
        return Err(ApiError::not_found("Document not available for editing"));
    }

    let project = load_project(state.store.as_ref(), document.project_id).await?;
    if !can_manage(&document, &project, user.id) {
        return Err(denied(
            user.id,
            "edit document",
            "You can only edit your own documents or documents in projects you can edit",
        ));
    }

    let mut validator = Validator::new();
    if let Some(title) = &body.title {
        validator.check(!title.trim().is_empty(), "Document title cannot be empty");
    }
    let category = parse_optional::<DocumentCategory>(body.category.as_deref()).unwrap_or_else(|e| {
        validator.check(false, e.message());
        None
    });
    validator.finish()?;

    if let Some(title) = body.title {
        document.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        document.description = description.trim().to_string();
    }
    if let Some(category) = category {
        document.category = category;
    }
    if let Some(tags) = body.tags {
        document.tags = tags.into_tags();
    }
    if let Some(is_public) = body.is_public {
        document.permissions.is_public = is_public;
    }
    document.updated_at = Utc::now();

    state.store.update_document(&document).await?;
    tracing::info!("Document {} updated by {}", document.id, user.id);

    Ok(ApiResponse::success(document_view(&state, &document).await?).with_message("Document updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct GrantInput {
    pub user: Uuid,
    pub permission: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PermissionsRequest {
    pub is_public: Option<bool>,
    pub allowed_users: Option<Vec<GrantInput>>,
}

/// One grant per user; a later entry for the same user replaces the earlier one.
fn build_grants(inputs: Vec<GrantInput>, granted_by: Uuid) -> Result<Vec<DocumentGrant>, ApiError> {
    let now = Utc::now();
    let mut order: Vec<Uuid> = Vec::new();
    let mut grants: HashMap<Uuid, DocumentGrant> = HashMap::new();
    for input in inputs {
        let permission: DocumentPermission = input
            .permission
            .trim()
            .parse()
            .map_err(|e: crate::models::UnknownVariant| ApiError::bad_request(e.to_string()))?;
        if !grants.contains_key(&input.user) {
            order.push(input.user);
        }
        grants.insert(
            input.user,
            DocumentGrant {
                user_id: input.user,
                permission,
                granted_by,
                granted_at: now,
            },
        );
    }
    Ok(order.into_iter().filter_map(|id| grants.remove(&id)).collect())
}

/// PUT /api/documents/:id/permissions - replace the ACL; owner only
pub async fn permissions_put(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<PermissionsRequest>,
) -> ApiResult<DocumentView> {
    let mut document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;

    if document.uploaded_by != user.id {
        return Err(denied(user.id, "change document ACL", "Only document owner can update permissions"));
    }

    if let Some(is_public) = body.is_public {
        document.permissions.is_public = is_public;
    }
    if let Some(allowed) = body.allowed_users {
        document.permissions.allowed_users = build_grants(allowed, user.id)?;
    }
    document.updated_at = Utc::now();

    state.store.update_document(&document).await?;
    tracing::info!(
        "ACL of document {} replaced by {} ({} grants)",
        document.id,
        user.id,
        document.permissions.allowed_users.len()
    );

    Ok(ApiResponse::success(document_view(&state, &document).await?).with_message("Permissions updated successfully"))
}

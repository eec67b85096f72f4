// handlers/protected/documents/upload.rs - POST /api/documents/upload/:project_id handler

use axum::{
    extract::{Multipart, Path, State},
    Extension,
};
use chrono::Utc;

use super::document_view;
use crate::access::{has_capability, Capability};
use crate::api::format::DocumentView;
use crate::error::ApiError;
use crate::handlers::files::{discard_uploads, save_upload};
use crate::handlers::utils::{denied, load_project, parse_id, parse_optional, parse_tags};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{Document, DocumentCategory, NewDocument, StoredUpload};
use crate::AppState;

const FILE_FIELD: &str = "document";

#[derive(Debug, Default)]
struct UploadForm {
    title: String,
    description: String,
    category: Option<String>,
    tags: String,
    is_public: bool,
    upload: Option<StoredUpload>,
}

/**
 * POST /api/documents/upload/:project_id - Multipart upload
 *
 * Parts: `document` (the file), `title`, `description`, `category`, `tags` (comma list),
 * `isPublic`. The bytes are durable on disk before the record is written; if anything after
 * that fails the stored file is removed again.
 */
pub async fn upload_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<DocumentView> {
    let project = load_project(state.store.as_ref(), parse_id(&project_id, "project")?).await?;

    if !has_capability(&project, user.id, Capability::UploadDocuments) {
        return Err(denied(
            user.id,
            "upload document",
            "You do not have permission to upload documents to this project",
        ));
    }

    let mut form = UploadForm::default();
    let read: Result<(), ApiError> = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some(FILE_FIELD) if form.upload.is_none() => {
                    form.upload = Some(save_upload(state.files.as_ref(), field).await?);
                }
                Some("title") => form.title = field.text().await?,
                Some("description") => form.description = field.text().await?,
                Some("category") => form.category = Some(field.text().await?),
                Some("tags") => form.tags = field.text().await?,
                Some("isPublic") => form.is_public = field.text().await?.trim() == "true",
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    let Some(upload) = form.upload.take() else {
        read?;
        return Err(ApiError::bad_request("No file uploaded"));
    };

    let created: Result<Document, ApiError> = async {
        read?;
        let title = form.title.trim();
        if title.is_empty() {
            return Err(ApiError::validation_error(
                "Validation failed",
                vec!["Document title is required".to_string()],
            ));
        }
        let category = parse_optional::<DocumentCategory>(form.category.as_deref())?;

        let document = Document::from_upload(
            NewDocument {
                title: title.to_string(),
                description: form.description.trim().to_string(),
                category: category.unwrap_or(DocumentCategory::Other),
                tags: parse_tags(&form.tags),
                is_public: form.is_public,
            },
            upload.clone(),
            project.id,
            user.id,
            Utc::now(),
        );
        state.store.create_document(&document).await?;
        Ok(document)
    }
    .await;

    let document = match created {
        Ok(document) => document,
        Err(e) => {
            discard_uploads(state.files.as_ref(), std::slice::from_ref(&upload)).await;
            return Err(e);
        }
    };
    tracing::info!(
        "Document {} ({} bytes) uploaded to project {} by {}",
        document.id,
        document.file_size,
        project.id,
        user.id
    );

    Ok(ApiResponse::created(document_view(&state, &document).await?).with_message("Document uploaded successfully"))
}

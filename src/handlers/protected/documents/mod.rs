// handlers/protected/documents/mod.rs - Document endpoints (verified email required)

pub mod delete;   // DELETE /api/documents/:id, PATCH /api/documents/:id/restore
pub mod download; // GET /api/documents/:id/download
pub mod list;     // GET /api/documents/project/:project_id[/deleted]
pub mod show;     // GET /api/documents/:id
pub mod update;   // PUT /api/documents/:id, PUT /api/documents/:id/permissions
pub mod upload;   // POST /api/documents/upload/:project_id

pub use delete::{document_delete, restore_patch};
pub use download::download_get;
pub use list::{deleted_documents_get, documents_get};
pub use show::document_get;
pub use update::{document_put, permissions_put};
pub use upload::upload_post;

use uuid::Uuid;

use crate::access::{has_capability, has_permission, is_member_or_creator, Capability, DocumentPermission};
use crate::api::format::{document_user_ids, DocumentView, UserDirectory};
use crate::error::ApiError;
use crate::models::{Document, Project};
use crate::AppState;

/// Read rule shared by details and download: the document's own ACL, or project membership.
pub(crate) fn can_read(document: &Document, project: &Project, user_id: Uuid) -> bool {
    has_permission(document, user_id, DocumentPermission::View) || can_list(project, user_id)
}

/// Any member sees the project's documents whatever their flags say; outsiders need
/// `canViewDocuments`, which only a public project grants them.
pub(crate) fn can_list(project: &Project, user_id: Uuid) -> bool {
    is_member_or_creator(project, user_id) || has_capability(project, user_id, Capability::ViewDocuments)
}

/// Update, delete and restore: the uploader, or anyone holding `canEdit` on the project.
pub(crate) fn can_manage(document: &Document, project: &Project, user_id: Uuid) -> bool {
    document.uploaded_by == user_id || has_capability(project, user_id, Capability::Edit)
}

pub(crate) async fn document_view(state: &AppState, document: &Document) -> Result<DocumentView, ApiError> {
    let users = UserDirectory::load(state.store.as_ref(), document_user_ids(document)).await?;
    Ok(DocumentView::new(document, &users))
}

/*
DOCUMENT ACCESS SUMMARY:

| Operation              | Rule                                                    |
|------------------------|---------------------------------------------------------|
| upload                 | project canUploadDocuments                              |
| list (active)          | member/creator OR canViewDocuments                      |
| list (deleted)         | project canEdit                                         |
| details / download     | ACL view (owner, public, grant) OR list rule            |
| update/delete/restore  | owner OR project canEdit                                |
| replace ACL            | owner only                                              |
*/

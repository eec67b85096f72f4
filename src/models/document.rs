use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;
use crate::access::document_acl::DocumentPermission;

text_enum! {
    /// Soft-delete lifecycle. Only `active` documents appear in standard listings.
    DocumentStatus("document status") {
        Active => "active",
        Archived => "archived",
        Deleted => "deleted",
    }
}

text_enum! {
    DocumentCategory("document category") {
        ResearchPaper => "research_paper",
        Dataset => "dataset",
        Presentation => "presentation",
        Report => "report",
        Code => "code",
        Other => "other",
    }
}

/// One entry of a document's access-control list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentGrant {
    pub user_id: Uuid,
    pub permission: DocumentPermission,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPermissions {
    pub is_public: bool,
    pub allowed_users: Vec<DocumentGrant>,
}

/// Immutable once written; versions are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub version_number: i32,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub change_log: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub user_id: Uuid,
    pub downloaded_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_extension: String,
    pub project_id: Uuid,
    pub uploaded_by: Uuid,
    pub permissions: DocumentPermissions,
    pub current_version: i32,
    pub versions: Vec<DocumentVersion>,
    pub status: DocumentStatus,
    pub tags: Vec<String>,
    pub category: DocumentCategory,
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File metadata handed back by the file store after the bytes are durable.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub category: DocumentCategory,
    pub tags: Vec<String>,
    pub is_public: bool,
}

impl Document {
    /// A freshly uploaded document: active, empty ACL, version 1 as the current version.
    pub fn from_upload(
        fields: NewDocument,
        upload: StoredUpload,
        project_id: Uuid,
        uploaded_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        let file_extension = std::path::Path::new(&upload.original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let first_version = DocumentVersion {
            version_number: 1,
            file_name: upload.file_name.clone(),
            file_path: upload.file_path.clone(),
            file_size: upload.file_size,
            uploaded_by,
            uploaded_at: now,
            change_log: "Initial upload".to_string(),
        };

        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            file_name: upload.file_name,
            original_name: upload.original_name,
            file_path: upload.file_path,
            file_size: upload.file_size,
            mime_type: upload.mime_type,
            file_extension,
            project_id,
            uploaded_by,
            permissions: DocumentPermissions {
                is_public: fields.is_public,
                allowed_users: Vec::new(),
            },
            current_version: 1,
            versions: vec![first_version],
            status: DocumentStatus::Active,
            tags: fields.tags,
            category: fields.category,
            view_count: 0,
            last_viewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn file_url(&self) -> String {
        format!("/api/documents/{}/download", self.id)
    }

    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    /// Every file path the document references, current file first.
    pub fn stored_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.file_path.as_str()];
        for version in &self.versions {
            if !paths.contains(&version.file_path.as_str()) {
                paths.push(version.file_path.as_str());
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_creates_first_version() {
        let owner = Uuid::new_v4();
        let doc = Document::from_upload(
            NewDocument {
                title: "Results".into(),
                description: String::new(),
                category: DocumentCategory::Dataset,
                tags: vec!["csv".into()],
                is_public: true,
            },
            StoredUpload {
                file_name: "abc-results.csv".into(),
                original_name: "results.csv".into(),
                file_path: "uploads/abc-results.csv".into(),
                file_size: 42,
                mime_type: "text/csv".into(),
            },
            Uuid::new_v4(),
            owner,
            Utc::now(),
        );

        assert_eq!(doc.current_version, 1);
        assert_eq!(doc.versions.len(), 1);
        assert_eq!(doc.versions[0].change_log, "Initial upload");
        assert_eq!(doc.file_extension, ".csv");
        assert!(doc.permissions.is_public);
        assert!(doc.permissions.allowed_users.is_empty());
        assert_eq!(doc.stored_paths(), vec!["uploads/abc-results.csv"]);
    }
}

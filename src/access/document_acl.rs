//! Per-document access-control list.
//!
//! Independent of project membership. Call sites that accept either source OR the two checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::text_enum;
use crate::models::Document;

text_enum! {
    /// Ordered grant levels: a level implies every level below it.
    DocumentPermission("document permission") {
        View => "view",
        Comment => "comment",
        Edit => "edit",
        Download => "download",
    }
}

impl DocumentPermission {
    pub const fn level(self) -> u8 {
        match self {
            DocumentPermission::View => 1,
            DocumentPermission::Comment => 2,
            DocumentPermission::Edit => 3,
            DocumentPermission::Download => 4,
        }
    }

    pub const fn implies(self, requested: DocumentPermission) -> bool {
        self.level() >= requested.level()
    }
}

impl PartialOrd for DocumentPermission {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentPermission {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}

pub fn has_permission(document: &Document, user_id: Uuid, requested: DocumentPermission) -> bool {
    if document.uploaded_by == user_id {
        return true;
    }
    if document.permissions.is_public && requested == DocumentPermission::View {
        return true;
    }
    document
        .permissions
        .allowed_users
        .iter()
        .find(|grant| grant.user_id == user_id)
        .is_some_and(|grant| grant.permission.implies(requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentCategory, DocumentGrant, NewDocument, StoredUpload};
    use chrono::Utc;

    fn document(owner: Uuid, is_public: bool) -> Document {
        Document::from_upload(
            NewDocument {
                title: "Draft".into(),
                description: String::new(),
                category: DocumentCategory::Report,
                tags: vec![],
                is_public,
            },
            StoredUpload {
                file_name: "x-draft.pdf".into(),
                original_name: "draft.pdf".into(),
                file_path: "uploads/x-draft.pdf".into(),
                file_size: 1,
                mime_type: "application/pdf".into(),
            },
            Uuid::new_v4(),
            owner,
            Utc::now(),
        )
    }

    fn grant(doc: &mut Document, user_id: Uuid, permission: DocumentPermission) {
        doc.permissions.allowed_users.push(DocumentGrant {
            user_id,
            permission,
            granted_by: doc.uploaded_by,
            granted_at: Utc::now(),
        });
    }

    #[test]
    fn owner_passes_every_level() {
        let owner = Uuid::new_v4();
        let doc = document(owner, false);
        for level in DocumentPermission::ALL {
            assert!(has_permission(&doc, owner, *level));
        }
    }

    #[test]
    fn stranger_view_follows_public_flag() {
        let stranger = Uuid::new_v4();
        assert!(!has_permission(&document(Uuid::new_v4(), false), stranger, DocumentPermission::View));

        let public = document(Uuid::new_v4(), true);
        assert!(has_permission(&public, stranger, DocumentPermission::View));
        assert!(!has_permission(&public, stranger, DocumentPermission::Comment));
        assert!(!has_permission(&public, stranger, DocumentPermission::Download));
    }

    #[test]
    fn edit_grant_implies_lower_levels_only() {
        let mut doc = document(Uuid::new_v4(), false);
        let editor = Uuid::new_v4();
        grant(&mut doc, editor, DocumentPermission::Edit);

        assert!(has_permission(&doc, editor, DocumentPermission::View));
        assert!(has_permission(&doc, editor, DocumentPermission::Comment));
        assert!(has_permission(&doc, editor, DocumentPermission::Edit));
        assert!(!has_permission(&doc, editor, DocumentPermission::Download));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(DocumentPermission::View < DocumentPermission::Comment);
        assert!(DocumentPermission::Edit < DocumentPermission::Download);
        assert_eq!(DocumentPermission::ALL.iter().max(), Some(&DocumentPermission::Download));
    }
}

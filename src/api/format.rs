//! Wire format for aggregates: camelCase fields, user references populated to summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::access::document_acl::DocumentPermission;
use crate::access::membership::effective_role;
use crate::access::permissions::{PermissionSet, ProjectRole};
use crate::access::threads::Threaded;
use crate::database::{DatabaseError, Store};
use crate::models::{
    Attachment, Deliverable, Discussion, DiscussionStatus, Document, DocumentCategory, DocumentStatus, DocumentVersion,
    Forum, ForumSettings, Project, ProjectCategory, ProjectStatus, Reply, ReplyStatus, Task, Timeline, User, UserRole,
    UserSummary,
};

/// A user reference: the summary when the user still resolves, the bare id otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(Uuid),
}

/// Summaries for every user referenced by a response, fetched in one store call.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<Uuid, UserSummary>,
}

impl UserDirectory {
    pub async fn load(store: &dyn Store, ids: impl IntoIterator<Item = Uuid>) -> Result<Self, DatabaseError> {
        let mut wanted: Vec<Uuid> = ids.into_iter().collect();
        wanted.sort_unstable();
        wanted.dedup();
        let users = store
            .find_users(&wanted)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();
        Ok(Self { users })
    }

    pub fn get(&self, id: Uuid) -> UserRef {
        match self.users.get(&id) {
            Some(summary) => UserRef::Populated(summary.clone()),
            None => UserRef::Id(id),
        }
    }
}

/// The caller's own account as returned by profile, login and admin listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub affiliation: String,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            affiliation: user.affiliation.clone(),
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub fn project_user_ids(project: &Project) -> impl Iterator<Item = Uuid> + '_ {
    std::iter::once(project.created_by)
        .chain(project.members.keys().copied())
        .chain(project.tasks.iter().filter_map(|t| t.assigned_to))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: UserRef,
    pub role: ProjectRole,
    pub permissions: PermissionSet,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub goals: Vec<String>,
    pub objectives: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub tasks: Vec<Task>,
    pub timeline: Timeline,
    pub created_by: UserRef,
    pub members: Vec<MemberView>,
    pub status: ProjectStatus,
    pub category: ProjectCategory,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<ProjectRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_permissions: Option<PermissionSet>,
}

impl ProjectView {
    pub fn new(project: &Project, users: &UserDirectory) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
            description: project.description.clone(),
            goals: project.goals.clone(),
            objectives: project.objectives.clone(),
            deliverables: project.deliverables.clone(),
            tasks: project.tasks.clone(),
            timeline: project.timeline,
            created_by: users.get(project.created_by),
            members: project
                .members_in_join_order()
                .into_iter()
                .map(|m| MemberView {
                    user: users.get(m.user_id),
                    role: m.role,
                    permissions: m.permissions,
                    joined_at: m.joined_at,
                })
                .collect(),
            status: project.status,
            category: project.category,
            is_public: project.is_public,
            tags: project.tags.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
            user_role: None,
            user_permissions: None,
        }
    }

    /// Adds the caller's effective role and capability set.
    pub fn for_viewer(project: &Project, users: &UserDirectory, viewer: Uuid) -> Self {
        let (role, permissions) = effective_role(project, viewer);
        Self {
            user_role: Some(role),
            user_permissions: Some(permissions),
            ..Self::new(project, users)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantView {
    pub user: UserRef,
    pub permission: DocumentPermission,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPermissionsView {
    pub is_public: bool,
    pub allowed_users: Vec<GrantView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_extension: String,
    pub file_url: String,
    pub project: Uuid,
    pub uploaded_by: UserRef,
    pub permissions: DocumentPermissionsView,
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

pub fn document_user_ids(document: &Document) -> impl Iterator<Item = Uuid> + '_ {
    std::iter::once(document.uploaded_by).chain(document.permissions.allowed_users.iter().map(|g| g.user_id))
}

impl DocumentView {
    pub fn new(document: &Document, users: &UserDirectory) -> Self {
        Self {
            id: document.id,
            title: document.title.clone(),
            description: document.description.clone(),
            file_name: document.file_name.clone(),
            original_name: document.original_name.clone(),
            file_size: document.file_size,
            mime_type: document.mime_type.clone(),
            file_extension: document.file_extension.clone(),
            file_url: document.file_url(),
            project: document.project_id,
            uploaded_by: users.get(document.uploaded_by),
            permissions: DocumentPermissionsView {
                is_public: document.permissions.is_public,
                allowed_users: document
                    .permissions
                    .allowed_users
                    .iter()
                    .map(|g| GrantView {
                        user: users.get(g.user_id),
                        permission: g.permission,
                        granted_by: g.granted_by,
                        granted_at: g.granted_at,
                    })
                    .collect(),
            },
            current_version: document.current_version,
            versions: document.versions.clone(),
            status: document.status,
            tags: document.tags.clone(),
            category: document.category,
            view_count: document.view_count,
            last_viewed_at: document.last_viewed_at,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub project: Uuid,
    pub created_by: UserRef,
    pub moderators: Vec<UserRef>,
    pub is_active: bool,
    pub settings: ForumSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForumView {
    pub fn new(forum: &Forum, users: &UserDirectory) -> Self {
        Self {
            id: forum.id,
            title: forum.title.clone(),
            description: forum.description.clone(),
            project: forum.project_id,
            created_by: users.get(forum.created_by),
            moderators: forum.moderators.iter().map(|&m| users.get(m)).collect(),
            is_active: forum.is_active,
            settings: forum.settings,
            created_at: forum.created_at,
            updated_at: forum.updated_at,
        }
    }
}

/// Attachment metadata; the stored path stays server side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Attachment> for AttachmentView {
    fn from(attachment: &Attachment) -> Self {
        Self {
            file_name: attachment.file_name.clone(),
            original_name: attachment.original_name.clone(),
            file_size: attachment.file_size,
            mime_type: attachment.mime_type.clone(),
            uploaded_at: attachment.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub forum: Uuid,
    pub project: Uuid,
    pub created_by: UserRef,
    pub tags: Vec<String>,
    pub attachments: Vec<AttachmentView>,
    pub status: DiscussionStatus,
    pub is_pinned: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscussionView {
    pub fn new(discussion: &Discussion, users: &UserDirectory) -> Self {
        Self {
            id: discussion.id,
            title: discussion.title.clone(),
            content: discussion.content.clone(),
            forum: discussion.forum_id,
            project: discussion.project_id,
            created_by: users.get(discussion.created_by),
            tags: discussion.tags.clone(),
            attachments: discussion.attachments.iter().map(AttachmentView::from).collect(),
            status: discussion.status,
            is_pinned: discussion.is_pinned,
            view_count: discussion.view_count,
            reply_count: discussion.reply_count,
            last_activity: discussion.last_activity,
            created_at: discussion.created_at,
            updated_at: discussion.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: Uuid,
    pub content: String,
    pub discussion: Uuid,
    pub author: UserRef,
    pub parent_reply: Option<Uuid>,
    pub attachments: Vec<AttachmentView>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub status: ReplyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReplyView {
    pub fn new(reply: &Reply, users: &UserDirectory) -> Self {
        Self {
            id: reply.id,
            content: reply.content.clone(),
            discussion: reply.discussion_id,
            author: users.get(reply.author),
            parent_reply: reply.parent_reply,
            attachments: reply.attachments.iter().map(AttachmentView::from).collect(),
            is_edited: reply.is_edited,
            edited_at: reply.edited_at,
            status: reply.status,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
        }
    }
}

impl Threaded for ReplyView {
    fn thread_id(&self) -> Uuid {
        self.id
    }

    fn thread_parent(&self) -> Option<Uuid> {
        self.parent_reply
    }
}

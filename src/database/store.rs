//! Persistence seam. Handlers talk to `dyn Store`; PostgreSQL and the in-process store both
//! implement it with the same atomicity guarantees for the compound writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::manager::DatabaseError;
use crate::config::{SearchConfig, SearchField};
use crate::models::{
    Discussion, DiscussionStatus, Document, DocumentCategory, DocumentStatus, DownloadRecord, Forum, Member,
    Project, ProjectCategory, ProjectStatus, Reply, User, UserRole,
};

/// 1-based page request, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Pagination block returned alongside list payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(pagination: Pagination, total: u64) -> Self {
        Self {
            current_page: pagination.page,
            total_pages: total.div_ceil(u64::from(pagination.limit)),
            total_items: total,
            items_per_page: pagination.limit,
            has_next: u64::from(pagination.page) * u64::from(pagination.limit) < total,
            has_prev: pagination.page > 1,
        }
    }
}

/// Case-insensitive literal substring match used by every search filter.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    /// Matches username, email or affiliation.
    pub search: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct ProjectQuery {
    /// Projects this user created or belongs to.
    pub user_id: Uuid,
    pub status: Option<ProjectStatus>,
    pub category: Option<ProjectCategory>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct PublicProjectQuery {
    pub search: Option<String>,
    pub fields: SearchConfig,
    pub pagination: Pagination,
}

impl PublicProjectQuery {
    pub fn matches(&self, project: &Project) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        (self.fields.matches(SearchField::Title) && contains_ci(&project.title, term))
            || (self.fields.matches(SearchField::Description) && contains_ci(&project.description, term))
            || (self.fields.matches(SearchField::Tags) && project.tags.iter().any(|t| contains_ci(t, term)))
    }
}

#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub project_id: Uuid,
    pub status: DocumentStatus,
    pub category: Option<DocumentCategory>,
    /// Matches title, description or any tag.
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl DocumentQuery {
    pub fn matches(&self, document: &Document) -> bool {
        if document.project_id != self.project_id || document.status != self.status {
            return false;
        }
        if self.category.is_some_and(|c| c != document.category) {
            return false;
        }
        match self.search.as_deref() {
            None => true,
            Some(term) => {
                contains_ci(&document.title, term)
                    || contains_ci(&document.description, term)
                    || document.tags.iter().any(|t| contains_ci(t, term))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscussionQuery {
    pub forum_id: Uuid,
    pub status: Option<DiscussionStatus>,
    /// Matches title or content.
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl DiscussionQuery {
    pub fn matches(&self, discussion: &Discussion) -> bool {
        if discussion.forum_id != self.forum_id {
            return false;
        }
        if self.status.is_some_and(|s| s != discussion.status) {
            return false;
        }
        match self.search.as_deref() {
            None => true,
            Some(term) => contains_ci(&discussion.title, term) || contains_ci(&discussion.content, term),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub verified_users: u64,
    pub unverified_users: u64,
    pub researchers: u64,
    pub academic_managers: u64,
    pub administrators: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub projects: u64,
    pub documents: u64,
    pub collaborations: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // Users

    /// Fails with `Conflict` when the email or username is taken.
    async fn create_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, DatabaseError>;
    /// Replaces every mutable column. Fails with `Conflict` on a taken username.
    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, DatabaseError>;
    async fn user_stats(&self) -> Result<UserStats, DatabaseError>;
    async fn dashboard_counts(&self, user_id: Uuid) -> Result<DashboardCounts, DatabaseError>;

    // Projects

    /// Inserts the project and its initial member rows.
    async fn create_project(&self, project: &Project) -> Result<(), DatabaseError>;
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;
    /// Writes the project's own fields. Members are only ever written through `insert_member`.
    async fn update_project(&self, project: &Project) -> Result<(), DatabaseError>;
    /// Atomic append; `Conflict` when the user is already a member.
    async fn insert_member(&self, project_id: Uuid, member: &Member) -> Result<(), DatabaseError>;
    async fn list_projects_for_user(&self, query: &ProjectQuery) -> Result<Page<Project>, DatabaseError>;
    async fn list_public_projects(&self, query: &PublicProjectQuery) -> Result<Page<Project>, DatabaseError>;

    // Documents

    async fn create_document(&self, document: &Document) -> Result<(), DatabaseError>;
    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError>;
    async fn update_document(&self, document: &Document) -> Result<(), DatabaseError>;
    async fn delete_document(&self, id: Uuid) -> Result<(), DatabaseError>;
    async fn list_documents(&self, query: &DocumentQuery) -> Result<Page<Document>, DatabaseError>;
    /// Appends a download entry and bumps the view counters in one step.
    async fn record_download(&self, document_id: Uuid, record: &DownloadRecord) -> Result<(), DatabaseError>;

    // Forums

    async fn create_forum(&self, forum: &Forum) -> Result<(), DatabaseError>;
    async fn find_forum(&self, id: Uuid) -> Result<Option<Forum>, DatabaseError>;
    async fn list_forums(&self, project_id: Uuid) -> Result<Vec<Forum>, DatabaseError>;

    async fn create_discussion(&self, discussion: &Discussion) -> Result<(), DatabaseError>;
    async fn find_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError>;
    /// Increments `viewCount` atomically and returns the updated discussion.
    async fn open_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError>;
    /// Pinned first, then most recent activity.
    async fn list_discussions(&self, query: &DiscussionQuery) -> Result<Page<Discussion>, DatabaseError>;
    async fn set_discussion_status(
        &self,
        id: Uuid,
        status: DiscussionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    async fn set_discussion_pinned(&self, id: Uuid, pinned: bool, now: DateTime<Utc>) -> Result<(), DatabaseError>;

    /// Inserts the reply, bumps `replyCount` and stamps `lastActivity` in one transaction.
    async fn create_reply(&self, reply: &Reply) -> Result<(), DatabaseError>;
    async fn find_reply(&self, id: Uuid) -> Result<Option<Reply>, DatabaseError>;
    /// Active replies of a discussion, oldest first.
    async fn list_replies(&self, discussion_id: Uuid, pagination: Pagination) -> Result<Page<Reply>, DatabaseError>;
    async fn update_reply(&self, reply: &Reply) -> Result<(), DatabaseError>;
    /// Marks the reply deleted and decrements `replyCount`, floored at zero. Returns `false`
    /// without touching the counter when the reply was not active.
    async fn soft_delete_reply(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DatabaseError>;
}

//! In-process [`Store`] used by the test harness and `--memory` runs.
//!
//! One lock guards every collection, so each trait method is atomic in the same way the
//! PostgreSQL transactions are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{
    contains_ci, DashboardCounts, DiscussionQuery, DocumentQuery, Page, Pagination, ProjectQuery,
    PublicProjectQuery, Store, UserQuery, UserStats,
};
use crate::access::membership::{is_creator, is_member_or_creator};
use crate::models::{
    Discussion, DiscussionStatus, Document, DocumentStatus, DownloadRecord, Forum, Member, Project, Reply,
    ReplyStatus, User, UserRole,
};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    documents: HashMap<Uuid, Document>,
    downloads: HashMap<Uuid, Vec<DownloadRecord>>,
    forums: HashMap<Uuid, Forum>,
    discussions: HashMap<Uuid, Discussion>,
    replies: HashMap<Uuid, Reply>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Download entries recorded for a document, oldest first.
    pub async fn downloads(&self, document_id: Uuid) -> Vec<DownloadRecord> {
        self.inner
            .read()
            .await
            .downloads
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn paginate<T>(items: Vec<T>, pagination: Pagination) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit as usize)
        .collect();
    Page { items, total }
}

fn not_found(what: &str) -> DatabaseError {
    DatabaseError::NotFound(format!("{} not found", what))
}

impl Collections {
    fn check_user_unique(&self, user: &User) -> Result<(), DatabaseError> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                return Err(DatabaseError::Conflict("User with this email already exists".to_string()));
            }
            if other.username == user.username {
                return Err(DatabaseError::Conflict("Username already taken".to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.check_user_unique(user)?;
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email_verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.reset_password_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.check_user_unique(user)?;
        let stored = inner.users.get_mut(&user.id).ok_or_else(|| not_found("User"))?;
        // email, role and created_at are fixed after registration
        let (email, role, created_at) = (stored.email.clone(), stored.role, stored.created_at);
        *stored = User {
            email,
            role,
            created_at,
            ..user.clone()
        };
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .filter(|u| {
                query.search.as_deref().map_or(true, |term| {
                    contains_ci(&u.username, term) || contains_ci(&u.email, term) || contains_ci(&u.affiliation, term)
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(users, query.pagination))
    }

    async fn user_stats(&self) -> Result<UserStats, DatabaseError> {
        let inner = self.inner.read().await;
        let mut stats = UserStats::default();
        for user in inner.users.values() {
            stats.total_users += 1;
            if user.is_email_verified {
                stats.verified_users += 1;
            } else {
                stats.unverified_users += 1;
            }
            match user.role {
                UserRole::Researcher => stats.researchers += 1,
                UserRole::AcademicManager => stats.academic_managers += 1,
                UserRole::Administrator => stats.administrators += 1,
            }
        }
        Ok(stats)
    }

    async fn dashboard_counts(&self, user_id: Uuid) -> Result<DashboardCounts, DatabaseError> {
        let inner = self.inner.read().await;
        let projects = inner
            .projects
            .values()
            .filter(|p| is_member_or_creator(p, user_id))
            .count() as u64;
        let collaborations = inner
            .projects
            .values()
            .filter(|p| p.members.contains_key(&user_id) && !is_creator(p, user_id))
            .count() as u64;
        let documents = inner
            .documents
            .values()
            .filter(|d| d.uploaded_by == user_id && d.status != DocumentStatus::Deleted)
            .count() as u64;
        Ok(DashboardCounts {
            projects,
            documents,
            collaborations,
        })
    }

    async fn create_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Ok(self.inner.read().await.projects.get(&id).cloned())
    }

    async fn update_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let stored = inner.projects.get_mut(&project.id).ok_or_else(|| not_found("Project"))?;
        let members = std::mem::take(&mut stored.members);
        *stored = Project {
            members,
            ..project.clone()
        };
        Ok(())
    }

    async fn insert_member(&self, project_id: Uuid, member: &Member) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let project = inner.projects.get_mut(&project_id).ok_or_else(|| not_found("Project"))?;
        if project.members.contains_key(&member.user_id) {
            return Err(DatabaseError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }
        project.members.insert(member.user_id, member.clone());
        project.updated_at = member.joined_at;
        Ok(())
    }

    async fn list_projects_for_user(&self, query: &ProjectQuery) -> Result<Page<Project>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut projects: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| is_member_or_creator(p, query.user_id))
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .filter(|p| query.category.map_or(true, |c| p.category == c))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(paginate(projects, query.pagination))
    }

    async fn list_public_projects(&self, query: &PublicProjectQuery) -> Result<Page<Project>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut projects: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| p.is_public && query.matches(p))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(projects, query.pagination))
    }

    async fn create_document(&self, document: &Document) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        Ok(self.inner.read().await.documents.get(&id).cloned())
    }

    async fn update_document(&self, document: &Document) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let stored = inner.documents.get_mut(&document.id).ok_or_else(|| not_found("Document"))?;
        let (view_count, last_viewed_at) = (stored.view_count, stored.last_viewed_at);
        *stored = Document {
            view_count,
            last_viewed_at,
            ..document.clone()
        };
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.documents.remove(&id);
        inner.downloads.remove(&id);
        Ok(())
    }

    async fn list_documents(&self, query: &DocumentQuery) -> Result<Page<Document>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut documents: Vec<Document> = inner.documents.values().filter(|d| query.matches(d)).cloned().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(documents, query.pagination))
    }

    async fn record_download(&self, document_id: Uuid, record: &DownloadRecord) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let document = inner.documents.get_mut(&document_id).ok_or_else(|| not_found("Document"))?;
        document.view_count += 1;
        document.last_viewed_at = Some(record.downloaded_at);
        inner.downloads.entry(document_id).or_default().push(record.clone());
        Ok(())
    }

    async fn create_forum(&self, forum: &Forum) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.forums.insert(forum.id, forum.clone());
        Ok(())
    }

    async fn find_forum(&self, id: Uuid) -> Result<Option<Forum>, DatabaseError> {
        Ok(self.inner.read().await.forums.get(&id).cloned())
    }

    async fn list_forums(&self, project_id: Uuid) -> Result<Vec<Forum>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut forums: Vec<Forum> = inner
            .forums
            .values()
            .filter(|f| f.project_id == project_id && f.is_active)
            .cloned()
            .collect();
        forums.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(forums)
    }

    async fn create_discussion(&self, discussion: &Discussion) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.discussions.insert(discussion.id, discussion.clone());
        Ok(())
    }

    async fn find_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError> {
        Ok(self.inner.read().await.discussions.get(&id).cloned())
    }

    async fn open_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError> {
        let mut inner = self.inner.write().await;
        Ok(inner.discussions.get_mut(&id).map(|d| {
            d.view_count += 1;
            d.clone()
        }))
    }

    async fn list_discussions(&self, query: &DiscussionQuery) -> Result<Page<Discussion>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut discussions: Vec<Discussion> =
            inner.discussions.values().filter(|d| query.matches(d)).cloned().collect();
        discussions.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then(b.last_activity.cmp(&a.last_activity))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(discussions, query.pagination))
    }

    async fn set_discussion_status(
        &self,
        id: Uuid,
        status: DiscussionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let discussion = inner.discussions.get_mut(&id).ok_or_else(|| not_found("Discussion"))?;
        discussion.status = status;
        discussion.updated_at = now;
        Ok(())
    }

    async fn set_discussion_pinned(&self, id: Uuid, pinned: bool, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let discussion = inner.discussions.get_mut(&id).ok_or_else(|| not_found("Discussion"))?;
        discussion.is_pinned = pinned;
        discussion.updated_at = now;
        Ok(())
    }

    async fn create_reply(&self, reply: &Reply) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let discussion = inner
            .discussions
            .get_mut(&reply.discussion_id)
            .ok_or_else(|| not_found("Discussion"))?;
        discussion.record_reply(reply.created_at);
        inner.replies.insert(reply.id, reply.clone());
        Ok(())
    }

    async fn find_reply(&self, id: Uuid) -> Result<Option<Reply>, DatabaseError> {
        Ok(self.inner.read().await.replies.get(&id).cloned())
    }

    async fn list_replies(&self, discussion_id: Uuid, pagination: Pagination) -> Result<Page<Reply>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut replies: Vec<Reply> = inner
            .replies
            .values()
            .filter(|r| r.discussion_id == discussion_id && r.is_active())
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(replies, pagination))
    }

    async fn update_reply(&self, reply: &Reply) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let stored = inner.replies.get_mut(&reply.id).ok_or_else(|| not_found("Reply"))?;
        stored.content = reply.content.clone();
        stored.is_edited = reply.is_edited;
        stored.edited_at = reply.edited_at;
        stored.updated_at = reply.updated_at;
        Ok(())
    }

    async fn soft_delete_reply(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut inner = self.inner.write().await;
        let Some(reply) = inner.replies.get_mut(&id).filter(|r| r.is_active()) else {
            return Ok(false);
        };
        reply.status = ReplyStatus::Deleted;
        reply.updated_at = now;
        let discussion_id = reply.discussion_id;

        if let Some(discussion) = inner.discussions.get_mut(&discussion_id) {
            discussion.release_reply();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Forum, UserRole};

    fn user(username: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: String::new(),
            affiliation: "Lab".into(),
            role: UserRole::Researcher,
            is_email_verified: true,
            email_verification_token: None,
            email_verification_expires: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_email_and_username_conflict() {
        let store = MemoryStore::new();
        store.create_user(&user("ada", "ada@example.org")).await.unwrap();

        let err = store.create_user(&user("ada2", "ada@example.org")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(msg) if msg.contains("email")));
        let err = store.create_user(&user("ada", "other@example.org")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(msg) if msg.contains("Username")));
    }

    #[tokio::test]
    async fn reply_lifecycle_keeps_counter_floored() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let forum = Forum::create("General".into(), "All".into(), Uuid::new_v4(), author, Utc::now());
        let discussion = Discussion::create("Hello".into(), "World".into(), vec![], &forum, author, Utc::now());
        store.create_discussion(&discussion).await.unwrap();

        let reply = Reply::create("hi".into(), discussion.id, author, None, Utc::now());
        store.create_reply(&reply).await.unwrap();
        assert_eq!(store.find_discussion(discussion.id).await.unwrap().unwrap().reply_count, 1);

        assert!(store.soft_delete_reply(reply.id, Utc::now()).await.unwrap());
        assert!(!store.soft_delete_reply(reply.id, Utc::now()).await.unwrap());

        let stored = store.find_discussion(discussion.id).await.unwrap().unwrap();
        assert_eq!(stored.reply_count, 0);
        assert_eq!(store.find_reply(reply.id).await.unwrap().unwrap().status, ReplyStatus::Deleted);
        assert_eq!(store.list_replies(discussion.id, Pagination::new(None, None, 20, 100)).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn open_discussion_counts_views() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let forum = Forum::create("General".into(), "All".into(), Uuid::new_v4(), author, Utc::now());
        let discussion = Discussion::create("Hello".into(), "World".into(), vec![], &forum, author, Utc::now());
        store.create_discussion(&discussion).await.unwrap();

        store.open_discussion(discussion.id).await.unwrap();
        let opened = store.open_discussion(discussion.id).await.unwrap().unwrap();
        assert_eq!(opened.view_count, 2);
        assert!(store.open_discussion(Uuid::new_v4()).await.unwrap().is_none());
    }
}

//! PostgreSQL implementation of [`Store`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::store::{
    DashboardCounts, DiscussionQuery, DocumentQuery, Page, Pagination, ProjectQuery, PublicProjectQuery, Store,
    UserQuery, UserStats,
};
use crate::access::permissions::PermissionSet;
use crate::config::SearchField;
use crate::models::{
    Attachment, Deliverable, Discussion, DiscussionStatus, Document, DocumentGrant, DocumentPermissions, DocumentVersion,
    DownloadRecord, Forum, ForumSettings, Member, Project, Reply, Task, Timeline, User,
};

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn members_for(&self, project_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<MemberRow>>, DatabaseError> {
        if project_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT project_id, user_id, role, permissions, joined_at
             FROM project_members WHERE project_id = ANY($1)",
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<MemberRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.project_id).or_default().push(row);
        }
        Ok(grouped)
    }

    async fn assemble_projects(&self, rows: Vec<ProjectRow>) -> Result<Vec<Project>, DatabaseError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = self.members_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let project_members = members.remove(&row.id).unwrap_or_default();
                row.into_project(project_members)
            })
            .collect()
    }
}

/// Maps a unique-constraint violation to `Conflict`, everything else to `Sqlx`.
fn conflict_or_sqlx(err: sqlx::Error, message: impl FnOnce(Option<&str>) -> String) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return DatabaseError::Conflict(message(db.constraint()));
        }
    }
    DatabaseError::Sqlx(err)
}

/// `%term%` with LIKE metacharacters escaped so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, pagination: Pagination) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(pagination.limit))
        .push(" OFFSET ")
        .push_bind(pagination.offset() as i64);
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    affiliation: String,
    role: String,
    is_email_verified: bool,
    email_verification_token: Option<String>,
    email_verification_expires: Option<DateTime<Utc>>,
    reset_password_token: Option<String>,
    reset_password_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            affiliation: row.affiliation,
            role: row.role.parse()?,
            is_email_verified: row.is_email_verified,
            email_verification_token: row.email_verification_token,
            email_verification_expires: row.email_verification_expires,
            reset_password_token: row.reset_password_token,
            reset_password_expires: row.reset_password_expires,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct MemberRow {
    project_id: Uuid,
    user_id: Uuid,
    role: String,
    permissions: Json<PermissionSet>,
    joined_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ProjectRow {
    id: Uuid,
    title: String,
    description: String,
    goals: Vec<String>,
    objectives: Vec<String>,
    deliverables: Json<Vec<Deliverable>>,
    tasks: Json<Vec<Task>>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_by: Uuid,
    status: String,
    category: String,
    is_public: bool,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self, member_rows: Vec<MemberRow>) -> Result<Project, DatabaseError> {
        let mut members = HashMap::with_capacity(member_rows.len());
        for row in member_rows {
            members.insert(
                row.user_id,
                Member {
                    user_id: row.user_id,
                    role: row.role.parse()?,
                    permissions: row.permissions.0,
                    joined_at: row.joined_at,
                },
            );
        }

        Ok(Project {
            id: self.id,
            title: self.title,
            description: self.description,
            goals: self.goals,
            objectives: self.objectives,
            deliverables: self.deliverables.0,
            tasks: self.tasks.0,
            timeline: Timeline {
                start_date: self.start_date,
                end_date: self.end_date,
            },
            created_by: self.created_by,
            members,
            status: self.status.parse()?,
            category: self.category.parse()?,
            is_public: self.is_public,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    title: String,
    description: String,
    file_name: String,
    original_name: String,
    file_path: String,
    file_size: i64,
    mime_type: String,
    file_extension: String,
    project_id: Uuid,
    uploaded_by: Uuid,
    is_public: bool,
    allowed_users: Json<Vec<DocumentGrant>>,
    current_version: i32,
    versions: Json<Vec<DocumentVersion>>,
    status: String,
    tags: Vec<String>,
    category: String,
    view_count: i64,
    last_viewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DatabaseError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            title: row.title,
            description: row.description,
            file_name: row.file_name,
            original_name: row.original_name,
            file_path: row.file_path,
            file_size: row.file_size,
            mime_type: row.mime_type,
            file_extension: row.file_extension,
            project_id: row.project_id,
            uploaded_by: row.uploaded_by,
            permissions: DocumentPermissions {
                is_public: row.is_public,
                allowed_users: row.allowed_users.0,
            },
            current_version: row.current_version,
            versions: row.versions.0,
            status: row.status.parse()?,
            tags: row.tags,
            category: row.category.parse()?,
            view_count: row.view_count,
            last_viewed_at: row.last_viewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ForumRow {
    id: Uuid,
    title: String,
    description: String,
    project_id: Uuid,
    created_by: Uuid,
    moderators: Vec<Uuid>,
    is_active: bool,
    settings: Json<ForumSettings>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ForumRow> for Forum {
    fn from(row: ForumRow) -> Self {
        Forum {
            id: row.id,
            title: row.title,
            description: row.description,
            project_id: row.project_id,
            created_by: row.created_by,
            moderators: row.moderators,
            is_active: row.is_active,
            settings: row.settings.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct DiscussionRow {
    id: Uuid,
    title: String,
    content: String,
    forum_id: Uuid,
    project_id: Uuid,
    created_by: Uuid,
    tags: Vec<String>,
    attachments: Json<Vec<Attachment>>,
    status: String,
    is_pinned: bool,
    view_count: i64,
    reply_count: i64,
    last_activity: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DiscussionRow> for Discussion {
    type Error = DatabaseError;

    fn try_from(row: DiscussionRow) -> Result<Self, Self::Error> {
        Ok(Discussion {
            id: row.id,
            title: row.title,
            content: row.content,
            forum_id: row.forum_id,
            project_id: row.project_id,
            created_by: row.created_by,
            tags: row.tags,
            attachments: row.attachments.0,
            status: row.status.parse()?,
            is_pinned: row.is_pinned,
            view_count: row.view_count,
            reply_count: row.reply_count,
            last_activity: row.last_activity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ReplyRow {
    id: Uuid,
    content: String,
    discussion_id: Uuid,
    author: Uuid,
    parent_reply: Option<Uuid>,
    attachments: Json<Vec<Attachment>>,
    is_edited: bool,
    edited_at: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReplyRow> for Reply {
    type Error = DatabaseError;

    fn try_from(row: ReplyRow) -> Result<Self, Self::Error> {
        Ok(Reply {
            id: row.id,
            content: row.content,
            discussion_id: row.discussion_id,
            author: row.author,
            parent_reply: row.parent_reply,
            attachments: row.attachments.0,
            is_edited: row.is_edited,
            edited_at: row.edited_at,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DatabaseError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn user_conflict(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "User with this email already exists".to_string(),
        _ => "Username already taken".to_string(),
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    qb.push(" WHERE TRUE");
    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(term) = query.search.as_deref() {
        let pattern = like_pattern(term);
        qb.push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR affiliation ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_member_project_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProjectQuery) {
    qb.push(" WHERE (p.created_by = ")
        .push_bind(query.user_id)
        .push(" OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ")
        .push_bind(query.user_id)
        .push("))");
    if let Some(status) = query.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(category) = query.category {
        qb.push(" AND p.category = ").push_bind(category.as_str());
    }
}

fn push_public_project_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &PublicProjectQuery) {
    qb.push(" WHERE p.is_public");
    let Some(term) = query.search.as_deref() else {
        return;
    };
    let pattern = like_pattern(term);
    let mut clauses = Vec::new();
    if query.fields.matches(SearchField::Title) {
        clauses.push("p.title ILIKE ");
    }
    if query.fields.matches(SearchField::Description) {
        clauses.push("p.description ILIKE ");
    }
    if query.fields.matches(SearchField::Tags) {
        clauses.push("EXISTS (SELECT 1 FROM unnest(p.tags) AS tag WHERE tag ILIKE ");
    }
    if clauses.is_empty() {
        qb.push(" AND FALSE");
        return;
    }

    qb.push(" AND (");
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*clause).push_bind(pattern.clone());
        if clause.starts_with("EXISTS") {
            qb.push(")");
        }
    }
    qb.push(")");
}

fn push_document_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &DocumentQuery) {
    qb.push(" WHERE project_id = ")
        .push_bind(query.project_id)
        .push(" AND status = ")
        .push_bind(query.status.as_str());
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(term) = query.search.as_deref() {
        let pattern = like_pattern(term);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn push_discussion_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &DiscussionQuery) {
    qb.push(" WHERE forum_id = ").push_bind(query.forum_id);
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(term) = query.search.as_deref() {
        let pattern = like_pattern(term);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, affiliation, role, is_email_verified,
                email_verification_token, email_verification_expires, reset_password_token,
                reset_password_expires, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.affiliation)
        .bind(user.role.as_str())
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.email_verification_expires)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_sqlx(e, user_conflict))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email_verification_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE reset_password_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, affiliation = $3, password_hash = $4, is_email_verified = $5,
                email_verification_token = $6, email_verification_expires = $7,
                reset_password_token = $8, reset_password_expires = $9, updated_at = $10
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.affiliation)
        .bind(&user.password_hash)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.email_verification_expires)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_sqlx(e, user_conflict))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM users");
        push_user_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, query.pagination);
        let rows: Vec<UserRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: to_count(total),
        })
    }

    async fn user_stats(&self) -> Result<UserStats, DatabaseError> {
        let (total, verified, researchers, managers, admins): (i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE is_email_verified),
                    COUNT(*) FILTER (WHERE role = 'researcher'),
                    COUNT(*) FILTER (WHERE role = 'academic_manager'),
                    COUNT(*) FILTER (WHERE role = 'administrator')
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total_users: to_count(total),
            verified_users: to_count(verified),
            unverified_users: to_count(total - verified),
            researchers: to_count(researchers),
            academic_managers: to_count(managers),
            administrators: to_count(admins),
        })
    }

    async fn dashboard_counts(&self, user_id: Uuid) -> Result<DashboardCounts, DatabaseError> {
        let (projects, documents, collaborations): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM projects p WHERE p.created_by = $1
                    OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = $1)),
                (SELECT COUNT(*) FROM documents WHERE uploaded_by = $1 AND status <> 'deleted'),
                (SELECT COUNT(*) FROM project_members m JOIN projects p ON p.id = m.project_id
                    WHERE m.user_id = $1 AND p.created_by <> $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardCounts {
            projects: to_count(projects),
            documents: to_count(documents),
            collaborations: to_count(collaborations),
        })
    }

    async fn create_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO projects (id, title, description, goals, objectives, deliverables, tasks, start_date,
                end_date, created_by, status, category, is_public, tags, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(project.id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.goals)
        .bind(&project.objectives)
        .bind(Json(&project.deliverables))
        .bind(Json(&project.tasks))
        .bind(project.timeline.start_date)
        .bind(project.timeline.end_date)
        .bind(project.created_by)
        .bind(project.status.as_str())
        .bind(project.category.as_str())
        .bind(project.is_public)
        .bind(&project.tags)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;

        for member in project.members.values() {
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id, role, permissions, joined_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(project.id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .bind(Json(member.permissions))
            .bind(member.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.assemble_projects(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE projects SET title = $2, description = $3, goals = $4, objectives = $5, deliverables = $6,
                tasks = $7, start_date = $8, end_date = $9, status = $10, category = $11, is_public = $12,
                tags = $13, updated_at = $14
             WHERE id = $1",
        )
        .bind(project.id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.goals)
        .bind(&project.objectives)
        .bind(Json(&project.deliverables))
        .bind(Json(&project.tasks))
        .bind(project.timeline.start_date)
        .bind(project.timeline.end_date)
        .bind(project.status.as_str())
        .bind(project.category.as_str())
        .bind(project.is_public)
        .bind(&project.tags)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Project not found".to_string()));
        }
        Ok(())
    }

    async fn insert_member(&self, project_id: Uuid, member: &Member) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role, permissions, joined_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(project_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .bind(Json(member.permissions))
        .bind(member.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_sqlx(e, |_| "User is already a member of this project".to_string()))?;

        sqlx::query("UPDATE projects SET updated_at = $2 WHERE id = $1")
            .bind(project_id)
            .bind(member.joined_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_projects_for_user(&self, query: &ProjectQuery) -> Result<Page<Project>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM projects p");
        push_member_project_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT p.* FROM projects p");
        push_member_project_filters(&mut select, query);
        select.push(" ORDER BY p.updated_at DESC");
        push_page(&mut select, query.pagination);
        let rows: Vec<ProjectRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: self.assemble_projects(rows).await?,
            total: to_count(total),
        })
    }

    async fn list_public_projects(&self, query: &PublicProjectQuery) -> Result<Page<Project>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM projects p");
        push_public_project_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT p.* FROM projects p");
        push_public_project_filters(&mut select, query);
        select.push(" ORDER BY p.created_at DESC");
        push_page(&mut select, query.pagination);
        let rows: Vec<ProjectRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: self.assemble_projects(rows).await?,
            total: to_count(total),
        })
    }

    async fn create_document(&self, document: &Document) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO documents (id, title, description, file_name, original_name, file_path, file_size,
                mime_type, file_extension, project_id, uploaded_by, is_public, allowed_users, current_version,
                versions, status, tags, category, view_count, last_viewed_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19,
                $20, $21, $22)",
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.file_name)
        .bind(&document.original_name)
        .bind(&document.file_path)
        .bind(document.file_size)
        .bind(&document.mime_type)
        .bind(&document.file_extension)
        .bind(document.project_id)
        .bind(document.uploaded_by)
        .bind(document.permissions.is_public)
        .bind(Json(&document.permissions.allowed_users))
        .bind(document.current_version)
        .bind(Json(&document.versions))
        .bind(document.status.as_str())
        .bind(&document.tags)
        .bind(document.category.as_str())
        .bind(document.view_count)
        .bind(document.last_viewed_at)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Document::try_from).transpose()
    }

    async fn update_document(&self, document: &Document) -> Result<(), DatabaseError> {
        // view_count and last_viewed_at are owned by record_download
        let result = sqlx::query(
            "UPDATE documents SET title = $2, description = $3, is_public = $4, allowed_users = $5,
                current_version = $6, versions = $7, status = $8, tags = $9, category = $10, updated_at = $11
             WHERE id = $1",
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(document.permissions.is_public)
        .bind(Json(&document.permissions.allowed_users))
        .bind(document.current_version)
        .bind(Json(&document.versions))
        .bind(document.status.as_str())
        .bind(&document.tags)
        .bind(document.category.as_str())
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Document not found".to_string()));
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_documents(&self, query: &DocumentQuery) -> Result<Page<Document>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_document_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM documents");
        push_document_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, query.pagination);
        let rows: Vec<DocumentRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: to_count(total),
        })
    }

    async fn record_download(&self, document_id: Uuid, record: &DownloadRecord) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO document_downloads (document_id, user_id, downloaded_at, ip_address)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(document_id)
        .bind(record.user_id)
        .bind(record.downloaded_at)
        .bind(&record.ip_address)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE documents SET view_count = view_count + 1, last_viewed_at = $2 WHERE id = $1")
            .bind(document_id)
            .bind(record.downloaded_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_forum(&self, forum: &Forum) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO forums (id, title, description, project_id, created_by, moderators, is_active, settings,
                created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(forum.id)
        .bind(&forum.title)
        .bind(&forum.description)
        .bind(forum.project_id)
        .bind(forum.created_by)
        .bind(&forum.moderators)
        .bind(forum.is_active)
        .bind(Json(forum.settings))
        .bind(forum.created_at)
        .bind(forum.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_forum(&self, id: Uuid) -> Result<Option<Forum>, DatabaseError> {
        let row: Option<ForumRow> = sqlx::query_as("SELECT * FROM forums WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Forum::from))
    }

    async fn list_forums(&self, project_id: Uuid) -> Result<Vec<Forum>, DatabaseError> {
        let rows: Vec<ForumRow> =
            sqlx::query_as("SELECT * FROM forums WHERE project_id = $1 AND is_active ORDER BY created_at DESC")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Forum::from).collect())
    }

    async fn create_discussion(&self, discussion: &Discussion) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO discussions (id, title, content, forum_id, project_id, created_by, tags, attachments,
                status, is_pinned, view_count, reply_count, last_activity, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(discussion.id)
        .bind(&discussion.title)
        .bind(&discussion.content)
        .bind(discussion.forum_id)
        .bind(discussion.project_id)
        .bind(discussion.created_by)
        .bind(&discussion.tags)
        .bind(Json(&discussion.attachments))
        .bind(discussion.status.as_str())
        .bind(discussion.is_pinned)
        .bind(discussion.view_count)
        .bind(discussion.reply_count)
        .bind(discussion.last_activity)
        .bind(discussion.created_at)
        .bind(discussion.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError> {
        let row: Option<DiscussionRow> = sqlx::query_as("SELECT * FROM discussions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Discussion::try_from).transpose()
    }

    async fn open_discussion(&self, id: Uuid) -> Result<Option<Discussion>, DatabaseError> {
        let row: Option<DiscussionRow> =
            sqlx::query_as("UPDATE discussions SET view_count = view_count + 1 WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Discussion::try_from).transpose()
    }

    async fn list_discussions(&self, query: &DiscussionQuery) -> Result<Page<Discussion>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM discussions");
        push_discussion_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM discussions");
        push_discussion_filters(&mut select, query);
        select.push(" ORDER BY is_pinned DESC, last_activity DESC");
        push_page(&mut select, query.pagination);
        let rows: Vec<DiscussionRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: to_count(total),
        })
    }

    async fn set_discussion_status(
        &self,
        id: Uuid,
        status: DiscussionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE discussions SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Discussion not found".to_string()));
        }
        Ok(())
    }

    async fn set_discussion_pinned(&self, id: Uuid, pinned: bool, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE discussions SET is_pinned = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(pinned)
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Discussion not found".to_string()));
        }
        Ok(())
    }

    async fn create_reply(&self, reply: &Reply) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO replies (id, content, discussion_id, author, parent_reply, attachments, is_edited,
                edited_at, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(reply.id)
        .bind(&reply.content)
        .bind(reply.discussion_id)
        .bind(reply.author)
        .bind(reply.parent_reply)
        .bind(Json(&reply.attachments))
        .bind(reply.is_edited)
        .bind(reply.edited_at)
        .bind(reply.status.as_str())
        .bind(reply.created_at)
        .bind(reply.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE discussions SET reply_count = reply_count + 1, last_activity = $2, updated_at = $2
             WHERE id = $1",
        )
        .bind(reply.discussion_id)
        .bind(reply.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_reply(&self, id: Uuid) -> Result<Option<Reply>, DatabaseError> {
        let row: Option<ReplyRow> = sqlx::query_as("SELECT * FROM replies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Reply::try_from).transpose()
    }

    async fn list_replies(&self, discussion_id: Uuid, pagination: Pagination) -> Result<Page<Reply>, DatabaseError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE discussion_id = $1 AND status = 'active'")
                .bind(discussion_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<ReplyRow> = sqlx::query_as(
            "SELECT * FROM replies WHERE discussion_id = $1 AND status = 'active'
             ORDER BY created_at ASC, id ASC LIMIT $2 OFFSET $3",
        )
        .bind(discussion_id)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: convert_all(rows)?,
            total: to_count(total),
        })
    }

    async fn update_reply(&self, reply: &Reply) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE replies SET content = $2, is_edited = $3, edited_at = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(reply.id)
        .bind(&reply.content)
        .bind(reply.is_edited)
        .bind(reply.edited_at)
        .bind(reply.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Reply not found".to_string()));
        }
        Ok(())
    }

    async fn soft_delete_reply(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let discussion_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE replies SET status = 'deleted', updated_at = $2
             WHERE id = $1 AND status = 'active' RETURNING discussion_id",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(discussion_id) = discussion_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE discussions SET reply_count = GREATEST(reply_count - 1, 0) WHERE id = $1")
            .bind(discussion_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

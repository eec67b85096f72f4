//! `PgStore` against a real PostgreSQL. Every test returns early unless `DATABASE_URL` is set
//! (directly or through `.env`); migrations run on connect.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use research_hub_api::access::{PermissionSet, ProjectRole};
use research_hub_api::config::DatabaseConfig;
use research_hub_api::database::{DatabaseError, DatabaseManager, Pagination, PgStore, Store};
use research_hub_api::models::{
    Attachment, Discussion, Document, DocumentCategory, DownloadRecord, Forum, Member, NewDocument, NewProject,
    Project, ProjectCategory, Reply, ReplyStatus, StoredUpload, Timeline, User, UserRole,
};

async fn connect() -> Result<Option<(PgStore, PgPool)>> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL store test");
        return Ok(None);
    };
    let config = DatabaseConfig {
        url: Some(url),
        max_connections: 2,
        connection_timeout: 10,
        run_migrations: true,
    };
    let pool = DatabaseManager::connect(&config).await?;
    Ok(Some((PgStore::new(pool.clone()), pool)))
}

/// Usernames and emails are unique across runs against the same database.
async fn user(store: &PgStore, name: &str) -> Result<User> {
    let now = Utc::now();
    let tag = Uuid::new_v4().simple().to_string();
    let user = User {
        id: Uuid::new_v4(),
        username: format!("{}-{}", name, &tag[..12]),
        email: format!("{}-{}@example.org", name, tag),
        password_hash: String::new(),
        affiliation: "Institute of Testing".into(),
        role: UserRole::Researcher,
        is_email_verified: true,
        email_verification_token: None,
        email_verification_expires: None,
        reset_password_token: None,
        reset_password_expires: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).await?;
    Ok(user)
}

async fn project(store: &PgStore, owner: &User) -> Result<Project> {
    let now = Utc::now();
    let project = Project::create(
        NewProject {
            title: "Storage".into(),
            description: "Rows and columns".into(),
            goals: vec![],
            objectives: vec![],
            deliverables: vec![],
            timeline: Timeline {
                start_date: now,
                end_date: now + Duration::days(30),
            },
            category: ProjectCategory::Research,
            is_public: false,
            tags: vec!["db".into()],
        },
        owner.id,
        now,
    );
    store.create_project(&project).await?;
    Ok(project)
}

fn upload(name: &str) -> StoredUpload {
    StoredUpload {
        file_name: format!("{}-{}", Uuid::new_v4(), name),
        original_name: name.into(),
        file_path: format!("/tmp/uploads/{}", name),
        file_size: 42,
        mime_type: "text/plain".into(),
    }
}

#[tokio::test]
async fn duplicate_member_insert_is_a_conflict() -> Result<()> {
    let Some((store, _)) = connect().await? else {
        return Ok(());
    };
    let owner = user(&store, "owner").await?;
    let member = user(&store, "member").await?;
    let project = project(&store, &owner).await?;

    let row = Member {
        user_id: member.id,
        role: ProjectRole::Researcher,
        permissions: ProjectRole::Researcher.default_permissions(),
        joined_at: Utc::now(),
    };
    store.insert_member(project.id, &row).await?;

    let again = Member {
        role: ProjectRole::Viewer,
        permissions: PermissionSet::VIEW_ONLY,
        ..row.clone()
    };
    let err = store.insert_member(project.id, &again).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)), "{:?}", err);

    // the creator row from create_project counts too
    let creator = Member {
        user_id: owner.id,
        ..row
    };
    assert!(matches!(
        store.insert_member(project.id, &creator).await,
        Err(DatabaseError::Conflict(_))
    ));

    let stored = store.find_project(project.id).await?.context("project")?;
    assert_eq!(stored.members.len(), 2);
    assert_eq!(stored.members[&member.id].role, ProjectRole::Researcher);
    assert_eq!(stored.members[&owner.id].permissions, PermissionSet::FULL);
    Ok(())
}

#[tokio::test]
async fn reply_counter_moves_with_replies_and_stops_at_zero() -> Result<()> {
    let Some((store, _)) = connect().await? else {
        return Ok(());
    };
    let author = user(&store, "author").await?;
    let project = project(&store, &author).await?;
    let forum = Forum::create("General".into(), "All".into(), project.id, author.id, Utc::now());
    store.create_forum(&forum).await?;

    let discussion = Discussion::create("Hello".into(), "World".into(), vec![], &forum, author.id, Utc::now())
        .with_attachments(vec![Attachment::from_upload(upload("agenda.txt"), Utc::now())]);
    store.create_discussion(&discussion).await?;

    let first = Reply::create("one".into(), discussion.id, author.id, None, Utc::now());
    store.create_reply(&first).await?;
    let second = Reply::create("two".into(), discussion.id, author.id, Some(first.id), Utc::now())
        .with_attachments(vec![Attachment::from_upload(upload("data.txt"), Utc::now())]);
    store.create_reply(&second).await?;

    let stored = store.find_discussion(discussion.id).await?.context("discussion")?;
    assert_eq!(stored.reply_count, 2);
    assert_eq!(stored.attachments, discussion.attachments);
    let stored_reply = store.find_reply(second.id).await?.context("reply")?;
    assert_eq!(stored_reply.attachments[0].original_name, "data.txt");

    assert!(store.soft_delete_reply(first.id, Utc::now()).await?);
    assert!(!store.soft_delete_reply(first.id, Utc::now()).await?);
    assert!(store.soft_delete_reply(second.id, Utc::now()).await?);
    assert!(!store.soft_delete_reply(second.id, Utc::now()).await?);

    let stored = store.find_discussion(discussion.id).await?.context("discussion")?;
    assert_eq!(stored.reply_count, 0);
    assert_eq!(store.find_reply(first.id).await?.context("reply")?.status, ReplyStatus::Deleted);
    let page = store.list_replies(discussion.id, Pagination::new(None, None, 20, 100)).await?;
    assert_eq!(page.total, 0);
    Ok(())
}

#[tokio::test]
async fn downloads_are_recorded_with_the_view_counter() -> Result<()> {
    let Some((store, pool)) = connect().await? else {
        return Ok(());
    };
    let owner = user(&store, "uploader").await?;
    let project = project(&store, &owner).await?;
    let document = Document::from_upload(
        NewDocument {
            title: "Notes".into(),
            description: String::new(),
            category: DocumentCategory::Report,
            tags: vec![],
            is_public: false,
        },
        upload("notes.txt"),
        project.id,
        owner.id,
        Utc::now(),
    );
    store.create_document(&document).await?;

    for ip in [Some("127.0.0.1"), None] {
        let record = DownloadRecord {
            user_id: owner.id,
            downloaded_at: Utc::now(),
            ip_address: ip.map(str::to_string),
        };
        store.record_download(document.id, &record).await?;
    }

    let stored = store.find_document(document.id).await?.context("document")?;
    assert_eq!(stored.view_count, 2);
    assert!(stored.last_viewed_at.is_some());
    assert_eq!(stored.current_version, 1);

    let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_downloads WHERE document_id = $1")
        .bind(document.id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(recorded, 2);
    Ok(())
}

// handlers/protected/forums/discussions.rs - Discussions within a forum

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::post_body::PostBody;
use super::replies::{thread_replies, ALL_REPLIES};
use super::{attachment_download, ensure_attachments_allowed};
use crate::access::{can_view_project, is_creator, is_member_or_creator, ThreadNode};
use crate::api::format::{DiscussionView, ReplyView, UserDirectory};
use crate::api::params::non_empty;
use crate::database::store::DiscussionQuery;
use crate::database::{PageInfo, Pagination};
use crate::error::ApiError;
use crate::handlers::files::discard_uploads;
use crate::handlers::utils::{denied, load_discussion, load_forum, load_project, parse_id, parse_optional, TagsInput};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{Attachment, Discussion, DiscussionStatus, StoredUpload, User};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateDiscussionRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<TagsInput>,
}

pub const MAX_DISCUSSION_ATTACHMENTS: usize = 5;

async fn discussion_view(state: &AppState, discussion: &Discussion) -> Result<DiscussionView, ApiError> {
    let users = UserDirectory::load(state.store.as_ref(), [discussion.created_by]).await?;
    Ok(DiscussionView::new(discussion, &users))
}

/**
 * POST /api/forums/:forum_id/discussions - Start a discussion
 *
 * JSON, or multipart with up to five `attachments` parts when the forum allows files.
 */
pub async fn discussion_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(forum_id): Path<String>,
    PostBody { body, files }: PostBody<CreateDiscussionRequest, MAX_DISCUSSION_ATTACHMENTS>,
) -> ApiResult<DiscussionView> {
    let created = start_discussion(&state, &user, &forum_id, body, &files).await;
    let discussion = match created {
        Ok(discussion) => discussion,
        Err(e) => {
            discard_uploads(state.files.as_ref(), &files).await;
            return Err(e);
        }
    };
    tracing::info!(
        "Discussion {} started in forum {} by {} with {} attachment(s)",
        discussion.id,
        discussion.forum_id,
        user.id,
        discussion.attachments.len()
    );

    let view = discussion_view(&state, &discussion).await?;
    Ok(ApiResponse::created(view).with_message("Discussion created successfully"))
}

async fn start_discussion(
    state: &AppState,
    user: &User,
    forum_id: &str,
    body: CreateDiscussionRequest,
    files: &[StoredUpload],
) -> Result<Discussion, ApiError> {
    let (title, content) = (body.title.trim(), body.content.trim());
    if title.is_empty() || content.is_empty() {
        return Err(ApiError::bad_request("Title and content are required"));
    }

    let forum = load_forum(state.store.as_ref(), parse_id(forum_id, "forum")?).await?;
    if !forum.is_active {
        return Err(ApiError::not_found("Forum not found"));
    }
    let project = load_project(state.store.as_ref(), forum.project_id).await?;
    if !is_member_or_creator(&project, user.id) {
        return Err(denied(user.id, "start discussion", "Access denied"));
    }
    ensure_attachments_allowed(&forum, files)?;

    let now = Utc::now();
    let discussion = Discussion::create(
        title.to_string(),
        content.to_string(),
        body.tags.map(TagsInput::into_tags).unwrap_or_default(),
        &forum,
        user.id,
        now,
    )
    .with_attachments(files.iter().cloned().map(|f| Attachment::from_upload(f, now)).collect());
    state.store.create_discussion(&discussion).await?;
    Ok(discussion)
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscussionListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscussionList {
    pub discussions: Vec<DiscussionView>,
    pub pagination: PageInfo,
}

/// GET /api/forums/:forum_id/discussions - pinned first, then most recent activity
pub async fn discussions_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(forum_id): Path<String>,
    Query(params): Query<DiscussionListParams>,
) -> ApiResult<DiscussionList> {
    let forum = load_forum(state.store.as_ref(), parse_id(&forum_id, "forum")?).await?;
    let project = load_project(state.store.as_ref(), forum.project_id).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "list discussions", "Access denied"));
    }

    let api = &state.config.api;
    let pagination = Pagination::new(params.page, params.limit, api.default_page_size, api.max_page_size);
    let query = DiscussionQuery {
        forum_id: forum.id,
        status: Some(parse_optional(params.status.as_deref())?.unwrap_or(DiscussionStatus::Active)),
        search: non_empty(params.search),
        pagination,
    };

    let page = state.store.list_discussions(&query).await?;
    let users = UserDirectory::load(state.store.as_ref(), page.items.iter().map(|d| d.created_by)).await?;

    Ok(ApiResponse::success(DiscussionList {
        discussions: page.items.iter().map(|d| DiscussionView::new(d, &users)).collect(),
        pagination: PageInfo::new(pagination, page.total),
    }))
}

#[derive(Debug, Serialize)]
pub struct DiscussionDetail {
    pub discussion: DiscussionView,
    pub replies: Vec<ThreadNode<ReplyView>>,
}

/// GET /api/forums/discussions/:id - counts a view and returns the full reply tree
pub async fn discussion_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<DiscussionDetail> {
    let discussion = load_discussion(state.store.as_ref(), parse_id(&id, "discussion")?).await?;
    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "read discussion", "Access denied"));
    }

    let discussion = state
        .store
        .open_discussion(discussion.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Discussion not found"))?;

    let replies = state.store.list_replies(discussion.id, ALL_REPLIES).await?;
    let replies = thread_replies(&state, replies.items).await?;

    Ok(ApiResponse::success(DiscussionDetail {
        discussion: discussion_view(&state, &discussion).await?,
        replies,
    }))
}

/// Author of the discussion, any moderator of its forum, or the project creator.
async fn ensure_can_moderate(
    state: &AppState,
    discussion: &Discussion,
    user: &User,
    action: &str,
) -> Result<(), ApiError> {
    if discussion.created_by == user.id {
        return Ok(());
    }
    let forum = load_forum(state.store.as_ref(), discussion.forum_id).await?;
    if forum.is_moderator(user.id) {
        return Ok(());
    }
    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if is_creator(&project, user.id) {
        return Ok(());
    }
    Err(denied(
        user.id,
        action,
        "Only the discussion author, a forum moderator or the project creator can do this",
    ))
}

/// PATCH /api/forums/discussions/:id/close
pub async fn discussion_close(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<DiscussionView> {
    let discussion = load_discussion(state.store.as_ref(), parse_id(&id, "discussion")?).await?;
    ensure_can_moderate(&state, &discussion, &user, "close discussion").await?;

    state
        .store
        .set_discussion_status(discussion.id, DiscussionStatus::Closed, Utc::now())
        .await?;
    tracing::info!("Discussion {} closed by {}", discussion.id, user.id);

    let discussion = load_discussion(state.store.as_ref(), discussion.id).await?;
    Ok(ApiResponse::success(discussion_view(&state, &discussion).await?).with_message("Discussion closed"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PinRequest {
    pub is_pinned: Option<bool>,
}

/// PATCH /api/forums/discussions/:id/pin - sets `isPinned`, or toggles it when omitted
pub async fn discussion_pin(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Option<Json<PinRequest>>,
) -> ApiResult<DiscussionView> {
    let discussion = load_discussion(state.store.as_ref(), parse_id(&id, "discussion")?).await?;
    ensure_can_moderate(&state, &discussion, &user, "pin discussion").await?;

    let pinned = body
        .and_then(|Json(b)| b.is_pinned)
        .unwrap_or(!discussion.is_pinned);
    state
        .store
        .set_discussion_pinned(discussion.id, pinned, Utc::now())
        .await?;
    tracing::info!("Discussion {} pinned={} by {}", discussion.id, pinned, user.id);

    let discussion = load_discussion(state.store.as_ref(), discussion.id).await?;
    let message = if pinned { "Discussion pinned" } else { "Discussion unpinned" };
    Ok(ApiResponse::success(discussion_view(&state, &discussion).await?).with_message(message))
}

/// GET /api/forums/discussions/:id/attachments/:file_name - anyone who can read the discussion
pub async fn discussion_attachment_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let discussion = load_discussion(state.store.as_ref(), parse_id(&id, "discussion")?).await?;
    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "download discussion attachment", "Access denied"));
    }
    attachment_download(&state, discussion.attachment(&file_name)).await
}

// handlers/protected/forums/replies.rs - Replies and reply threads

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post_body::PostBody;
use super::{attachment_download, ensure_attachments_allowed};
use crate::access::{build_threads, can_view_project, is_member_or_creator, ThreadNode};
use crate::api::format::{ReplyView, UserDirectory};
use crate::api::params::PageParams;
use crate::database::{PageInfo, Pagination};
use crate::error::ApiError;
use crate::handlers::files::discard_uploads;
use crate::handlers::utils::{denied, load_discussion, load_forum, load_project, load_reply, parse_id};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::models::{Attachment, DiscussionStatus, Reply, StoredUpload, User};
use crate::AppState;

const DEFAULT_REPLY_PAGE: u32 = 20;

/// Every active reply of a discussion in one page.
pub(crate) const ALL_REPLIES: Pagination = Pagination {
    page: 1,
    limit: u32::MAX,
};

/// Populates authors and nests replies under their parents. Replies whose parent is not in
/// `replies` are left out of the tree.
pub(crate) async fn thread_replies(
    state: &AppState,
    replies: Vec<Reply>,
) -> Result<Vec<ThreadNode<ReplyView>>, ApiError> {
    let users = UserDirectory::load(state.store.as_ref(), replies.iter().map(|r| r.author)).await?;
    let views: Vec<ReplyView> = replies.iter().map(|r| ReplyView::new(r, &users)).collect();
    Ok(build_threads(views))
}

async fn reply_view(state: &AppState, reply: &Reply) -> Result<ReplyView, ApiError> {
    let users = UserDirectory::load(state.store.as_ref(), [reply.author]).await?;
    Ok(ReplyView::new(reply, &users))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub content: String,
    pub parent_reply: Option<Uuid>,
}

pub const MAX_REPLY_ATTACHMENTS: usize = 3;

/**
 * POST /api/forums/discussions/:id/replies - Reply to a discussion or to another reply
 *
 * The discussion must be active and the caller a member or creator of its project. A parent,
 * when given, must be an active reply in the same discussion. Multipart bodies may carry up to
 * three `attachments` parts.
 */
pub async fn reply_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    PostBody { body, files }: PostBody<CreateReplyRequest, MAX_REPLY_ATTACHMENTS>,
) -> ApiResult<ReplyView> {
    let reply = match post_reply(&state, &user, &id, body, &files).await {
        Ok(reply) => reply,
        Err(e) => {
            discard_uploads(state.files.as_ref(), &files).await;
            return Err(e);
        }
    };
    tracing::info!("Reply {} added to discussion {} by {}", reply.id, reply.discussion_id, user.id);

    Ok(ApiResponse::created(reply_view(&state, &reply).await?).with_message("Reply posted successfully"))
}

async fn post_reply(
    state: &AppState,
    user: &User,
    discussion_id: &str,
    body: CreateReplyRequest,
    files: &[StoredUpload],
) -> Result<Reply, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Reply content is required"));
    }

    let discussion = load_discussion(state.store.as_ref(), parse_id(discussion_id, "discussion")?).await?;
    if discussion.status != DiscussionStatus::Active {
        return Err(ApiError::forbidden("Discussion is closed"));
    }

    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if !is_member_or_creator(&project, user.id) {
        return Err(denied(user.id, "reply to discussion", "Access denied"));
    }

    if let Some(parent_id) = body.parent_reply {
        let parent_ok = state
            .store
            .find_reply(parent_id)
            .await?
            .is_some_and(|p| p.discussion_id == discussion.id && p.is_active());
        if !parent_ok {
            return Err(ApiError::bad_request("Parent reply not found in this discussion"));
        }
    }

    if !files.is_empty() {
        let forum = load_forum(state.store.as_ref(), discussion.forum_id).await?;
        ensure_attachments_allowed(&forum, files)?;
    }

    let now = Utc::now();
    let reply = Reply::create(content.to_string(), discussion.id, user.id, body.parent_reply, now)
        .with_attachments(files.iter().cloned().map(|f| Attachment::from_upload(f, now)).collect());
    state.store.create_reply(&reply).await?;
    Ok(reply)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPage {
    pub replies: Vec<ThreadNode<ReplyView>>,
    pub total_replies: u64,
    pub has_more: bool,
    pub pagination: PageInfo,
}

/// GET /api/forums/discussions/:id/replies - one page of active replies, oldest first, threaded
/// within the page
pub async fn replies_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ReplyPage> {
    let discussion = load_discussion(state.store.as_ref(), parse_id(&id, "discussion")?).await?;
    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "read replies", "Access denied"));
    }

    let pagination = params.pagination_with_default(DEFAULT_REPLY_PAGE, &state.config.api);
    let page = state.store.list_replies(discussion.id, pagination).await?;
    let has_more = pagination.offset() + (page.items.len() as u64) < page.total;
    let total = page.total;

    Ok(ApiResponse::success(ReplyPage {
        replies: thread_replies(&state, page.items).await?,
        total_replies: total,
        has_more,
        pagination: PageInfo::new(pagination, total),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateReplyRequest {
    pub content: String,
}

/// PUT /api/forums/replies/:id - author only
pub async fn reply_put(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateReplyRequest>,
) -> ApiResult<ReplyView> {
    let mut reply = load_reply(state.store.as_ref(), parse_id(&id, "reply")?).await?;
    if !reply.is_active() {
        return Err(ApiError::not_found("Reply not found"));
    }
    if reply.author != user.id {
        return Err(denied(user.id, "edit reply", "You can only edit your own replies"));
    }

    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Reply content is required"));
    }

    reply.edit(content.to_string(), Utc::now());
    state.store.update_reply(&reply).await?;

    Ok(ApiResponse::success(reply_view(&state, &reply).await?).with_message("Reply updated successfully"))
}

/// DELETE /api/forums/replies/:id - author only; a reply can only be deleted once
pub async fn reply_delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let reply = load_reply(state.store.as_ref(), parse_id(&id, "reply")?).await?;
    if reply.author != user.id {
        return Err(denied(user.id, "delete reply", "You can only delete your own replies"));
    }

    if !state.store.soft_delete_reply(reply.id, Utc::now()).await? {
        return Err(ApiError::not_found("Reply not found"));
    }
    tracing::info!("Reply {} deleted by {}", reply.id, user.id);

    Ok(ApiResponse::message("Reply deleted successfully"))
}

/// GET /api/forums/replies/:id/attachments/:file_name - anyone who can read the discussion
pub async fn reply_attachment_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let reply = load_reply(state.store.as_ref(), parse_id(&id, "reply")?).await?;
    if !reply.is_active() {
        return Err(ApiError::not_found("Reply not found"));
    }
    let discussion = load_discussion(state.store.as_ref(), reply.discussion_id).await?;
    let project = load_project(state.store.as_ref(), discussion.project_id).await?;
    if !can_view_project(&project, user.id) {
        return Err(denied(user.id, "download reply attachment", "Access denied"));
    }
    attachment_download(&state, reply.attachment(&file_name)).await
}

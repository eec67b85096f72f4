// handlers/protected/forums/mod.rs - Forum, discussion and reply endpoints

pub mod discussions; // /api/forums/:forum_id/discussions, /api/forums/discussions/:id[/close|/pin|/attachments]
pub mod forums;      // /api/forums/project/:project_id
pub mod post_body;   // JSON or multipart bodies for discussions and replies
pub mod replies;     // /api/forums/discussions/:id/replies, /api/forums/replies/:id[/attachments]

pub use discussions::{
    discussion_attachment_get, discussion_close, discussion_get, discussion_pin, discussion_post, discussions_get,
};
pub use forums::{forum_post, forums_get};
pub use replies::{replies_get, reply_attachment_get, reply_delete, reply_post, reply_put};

use axum::response::Response;

use crate::error::ApiError;
use crate::handlers::files::file_response;
use crate::models::{Attachment, Forum, StoredUpload};
use crate::AppState;

pub(crate) fn ensure_attachments_allowed(forum: &Forum, files: &[StoredUpload]) -> Result<(), ApiError> {
    if !files.is_empty() && !forum.settings.allow_file_attachments {
        return Err(ApiError::bad_request("File attachments are not allowed in this forum"));
    }
    Ok(())
}

pub(crate) async fn attachment_download(state: &AppState, attachment: Option<&Attachment>) -> Result<Response, ApiError> {
    let attachment = attachment.ok_or_else(|| ApiError::not_found("Attachment not found"))?;
    file_response(
        state.files.as_ref(),
        &attachment.file_path,
        &attachment.original_name,
        &attachment.mime_type,
        attachment.file_size,
    )
    .await
}


/*
FORUM RULES:

- Reads (forums, discussions, replies, attachments) need read access to the owning project:
  member, creator, or anyone when the project is public.
- Writes (forum, discussion, reply) need membership or creatorship of the owning project.
- Attachments: up to 5 per discussion and 3 per reply, only in forums whose settings allow
  files. Stored files are removed again when the post is rejected.
- Close / pin: discussion author, a forum moderator, or the project creator.
- Reply edit / delete: the reply's author only.
- `replyCount` moves in the same store transaction as the reply insert or soft delete and
  never drops below zero.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{text_enum, StoredUpload};
use crate::access::threads::Threaded;

text_enum! {
    /// Only the close operation writes this field after creation.
    DiscussionStatus("discussion status") {
        Active => "active",
        Closed => "closed",
        Archived => "archived",
        Deleted => "deleted",
    }
}

text_enum! {
    ReplyStatus("reply status") {
        Active => "active",
        Deleted => "deleted",
        Moderated => "moderated",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumSettings {
    pub allow_file_attachments: bool,
    pub require_moderation: bool,
    pub allow_anonymous: bool,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            allow_file_attachments: true,
            require_moderation: false,
            allow_anonymous: false,
        }
    }
}

/// A file posted alongside a discussion or reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    pub fn from_upload(upload: StoredUpload, now: DateTime<Utc>) -> Self {
        Self {
            file_name: upload.file_name,
            original_name: upload.original_name,
            file_path: upload.file_path,
            file_size: upload.file_size,
            mime_type: upload.mime_type,
            uploaded_at: now,
        }
    }
}

fn find_attachment<'a>(attachments: &'a [Attachment], file_name: &str) -> Option<&'a Attachment> {
    attachments.iter().find(|a| a.file_name == file_name)
}

#[derive(Debug, Clone)]
pub struct Forum {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub moderators: Vec<Uuid>,
    pub is_active: bool,
    pub settings: ForumSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Forum {
    /// A new active forum moderated by its creator.
    pub fn create(title: String, description: String, project_id: Uuid, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            project_id,
            created_by,
            moderators: vec![created_by],
            is_active: true,
            settings: ForumSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_moderator(&self, user_id: Uuid) -> bool {
        self.moderators.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct Discussion {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub forum_id: Uuid,
    /// Denormalized from the forum so authorization needs one lookup.
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub status: DiscussionStatus,
    pub is_pinned: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discussion {
    pub fn create(
        title: String,
        content: String,
        tags: Vec<String>,
        forum: &Forum,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            forum_id: forum.id,
            project_id: forum.project_id,
            created_by,
            tags,
            attachments: Vec::new(),
            status: DiscussionStatus::Active,
            is_pinned: false,
            view_count: 0,
            reply_count: 0,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn attachment(&self, file_name: &str) -> Option<&Attachment> {
        find_attachment(&self.attachments, file_name)
    }

    pub fn record_reply(&mut self, now: DateTime<Utc>) {
        self.reply_count += 1;
        self.last_activity = now;
        self.updated_at = now;
    }

    /// Never drops below zero.
    pub fn release_reply(&mut self) {
        self.reply_count = (self.reply_count - 1).max(0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub content: String,
    #[serde(rename = "discussion")]
    pub discussion_id: Uuid,
    pub author: Uuid,
    pub parent_reply: Option<Uuid>,
    pub attachments: Vec<Attachment>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub status: ReplyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reply {
    pub fn create(
        content: String,
        discussion_id: Uuid,
        author: Uuid,
        parent_reply: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            discussion_id,
            author,
            parent_reply,
            attachments: Vec::new(),
            is_edited: false,
            edited_at: None,
            status: ReplyStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn attachment(&self, file_name: &str) -> Option<&Attachment> {
        find_attachment(&self.attachments, file_name)
    }

    pub fn edit(&mut self, content: String, now: DateTime<Utc>) {
        self.content = content;
        self.is_edited = true;
        self.edited_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status == ReplyStatus::Active
    }
}

impl Threaded for Reply {
    fn thread_id(&self) -> Uuid {
        self.id
    }

    fn thread_parent(&self) -> Option<Uuid> {
        self.parent_reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discussion() -> Discussion {
        let forum = Forum::create("General".into(), "Talk".into(), Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        Discussion::create("Kickoff".into(), "Agenda".into(), vec![], &forum, forum.created_by, Utc::now())
    }

    #[test]
    fn forum_creator_moderates() {
        let creator = Uuid::new_v4();
        let forum = Forum::create("General".into(), "Talk".into(), Uuid::new_v4(), creator, Utc::now());
        assert!(forum.is_moderator(creator));
        assert!(forum.is_active);
        assert!(forum.settings.allow_file_attachments);
    }

    #[test]
    fn reply_count_is_floored_at_zero() {
        let mut discussion = discussion();
        discussion.record_reply(Utc::now());
        assert_eq!(discussion.reply_count, 1);
        discussion.release_reply();
        discussion.release_reply();
        assert_eq!(discussion.reply_count, 0);
    }

    #[test]
    fn attachments_are_found_by_stored_name() {
        let upload = StoredUpload {
            file_name: "a1-plot.png".into(),
            original_name: "plot.png".into(),
            file_path: "/tmp/uploads/a1-plot.png".into(),
            file_size: 12,
            mime_type: "image/png".into(),
        };
        let discussion = discussion().with_attachments(vec![Attachment::from_upload(upload, Utc::now())]);
        assert_eq!(discussion.attachment("a1-plot.png").map(|a| a.original_name.as_str()), Some("plot.png"));
        assert!(discussion.attachment("plot.png").is_none());
    }

    #[test]
    fn editing_marks_reply() {
        let mut reply = Reply::create("first".into(), Uuid::new_v4(), Uuid::new_v4(), None, Utc::now());
        reply.edit("second".into(), Utc::now());
        assert!(reply.is_edited);
        assert!(reply.edited_at.is_some());
        assert_eq!(reply.content, "second");
    }
}

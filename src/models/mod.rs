//! Aggregates persisted by the store and the closed enums that replace free-form status strings.

/// Error returned when a stored or submitted value is not one of an enum's variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed string-backed enum: snake_case wire and column form, `as_str`,
/// `FromStr` and `Display`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod document;
pub mod forum;
pub mod project;
pub mod user;

pub use document::{
    Document, DocumentCategory, DocumentGrant, DocumentPermissions, DocumentStatus, DocumentVersion, DownloadRecord,
    NewDocument, StoredUpload,
};
pub use forum::{Attachment, Discussion, DiscussionStatus, Forum, ForumSettings, Reply, ReplyStatus};
pub use project::{
    Deliverable, DeliverableStatus, Member, NewProject, Project, ProjectCategory, ProjectStatus, Task, TaskPriority,
    TaskStatus, Timeline,
};
pub use user::{User, UserRole, UserSummary};

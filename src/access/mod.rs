//! Authorization core: project capabilities, membership resolution, the per-document ACL,
//! and reply thread reconstruction.
//!
//! Everything here is pure and works on loaded aggregates. Handlers load current state from
//! the store, ask these functions, and only then write.

pub mod document_acl;
pub mod membership;
pub mod permissions;
pub mod threads;

pub use document_acl::{has_permission, DocumentPermission};
pub use membership::{
    add_member, can_view_project, effective_role, has_capability, is_creator, is_member_or_creator, request_self_join,
    resolve_membership, MembershipError,
};
pub use permissions::{default_permissions_for_role, Capability, PermissionOverrides, PermissionSet, ProjectRole};
pub use threads::{build_threads, ThreadNode, Threaded};

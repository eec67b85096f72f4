//! Membership and capability resolution for projects.
//!
//! The creator rule is evaluated before the member map is consulted: a project's creator holds
//! every capability whether or not a membership row exists for them.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::permissions::{Capability, PermissionSet, ProjectRole};
use crate::models::{Member, Project, User};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("User is already a member of this project")]
    DuplicateMember,

    #[error("You are already a member of this project")]
    AlreadyMember,

    #[error("Cannot add unverified user. They must verify their email first.")]
    UnverifiedUser,

    #[error("This project is not public")]
    NotPublic,
}

pub fn resolve_membership(project: &Project, user_id: Uuid) -> Option<&Member> {
    project.members.get(&user_id)
}

pub fn is_creator(project: &Project, user_id: Uuid) -> bool {
    project.created_by == user_id
}

pub fn has_capability(project: &Project, user_id: Uuid, capability: Capability) -> bool {
    if is_creator(project, user_id) {
        return true;
    }
    if resolve_membership(project, user_id).is_some_and(|m| m.permissions.allows(capability)) {
        return true;
    }
    capability == Capability::ViewDocuments && project.is_public
}

pub fn is_member_or_creator(project: &Project, user_id: Uuid) -> bool {
    is_creator(project, user_id) || resolve_membership(project, user_id).is_some()
}

/// Read access to the project record itself.
pub fn can_view_project(project: &Project, user_id: Uuid) -> bool {
    project.is_public || is_member_or_creator(project, user_id)
}

/// The role and capability set reported to `user_id` when it looks at the project.
/// Non-members see `viewer` with a view-only set; the creator always sees the full set.
pub fn effective_role(project: &Project, user_id: Uuid) -> (ProjectRole, PermissionSet) {
    match resolve_membership(project, user_id) {
        Some(member) if is_creator(project, user_id) => (member.role, PermissionSet::FULL),
        Some(member) => (member.role, member.permissions),
        None if is_creator(project, user_id) => (ProjectRole::ProjectManager, PermissionSet::FULL),
        None => (ProjectRole::Viewer, PermissionSet::VIEW_ONLY),
    }
}

/// Enrolls `target` in `project`.
///
/// Explicit permissions win over the role's default row. The caller's own authority
/// (`canManageMembers`) is checked by the handler before this runs.
pub fn add_member(
    project: &mut Project,
    target: &User,
    role: ProjectRole,
    explicit_permissions: Option<PermissionSet>,
    now: DateTime<Utc>,
) -> Result<Member, MembershipError> {
    if resolve_membership(project, target.id).is_some() {
        return Err(MembershipError::DuplicateMember);
    }
    if !target.is_email_verified {
        return Err(MembershipError::UnverifiedUser);
    }

    let member = Member {
        user_id: target.id,
        role,
        permissions: explicit_permissions.unwrap_or_else(|| role.default_permissions()),
        joined_at: now,
    };
    project.members.insert(target.id, member.clone());
    project.updated_at = now;
    Ok(member)
}

/// Self-service join for public projects. Always yields a collaborator with the
/// collaborator row; nothing the caller sends can change that.
pub fn request_self_join(project: &mut Project, user_id: Uuid, now: DateTime<Utc>) -> Result<Member, MembershipError> {
    if !project.is_public {
        return Err(MembershipError::NotPublic);
    }
    if is_member_or_creator(project, user_id) {
        return Err(MembershipError::AlreadyMember);
    }

    let member = Member {
        user_id,
        role: ProjectRole::Collaborator,
        permissions: ProjectRole::Collaborator.default_permissions(),
        joined_at: now,
    };
    project.members.insert(user_id, member.clone());
    project.updated_at = now;
    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProject, ProjectCategory, Timeline, UserRole};
    use chrono::Duration;

    fn project(creator: Uuid, is_public: bool) -> Project {
        let now = Utc::now();
        Project::create(
            NewProject {
                title: "Soil microbiome".into(),
                description: "Sampling across three sites".into(),
                goals: vec!["map".into()],
                objectives: vec!["sample".into()],
                deliverables: vec![],
                timeline: Timeline {
                    start_date: now,
                    end_date: now + Duration::days(90),
                },
                category: ProjectCategory::Research,
                is_public,
                tags: vec![],
            },
            creator,
            now,
        )
    }

    fn user(verified: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "grace".into(),
            email: "grace@example.org".into(),
            password_hash: String::new(),
            affiliation: "Navy".into(),
            role: UserRole::Researcher,
            is_email_verified: verified,
            email_verification_token: None,
            email_verification_expires: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    const ALL_CAPABILITIES: [Capability; 4] = [
        Capability::Edit,
        Capability::ManageMembers,
        Capability::UploadDocuments,
        Capability::ViewDocuments,
    ];

    #[test]
    fn creator_holds_every_capability_without_a_member_row() {
        let creator = Uuid::new_v4();
        let mut project = project(creator, false);
        project.members.clear();
        for capability in ALL_CAPABILITIES {
            assert!(has_capability(&project, creator, capability));
        }
    }

    #[test]
    fn creator_rule_beats_a_downgraded_member_row() {
        let creator = Uuid::new_v4();
        let mut project = project(creator, false);
        if let Some(member) = project.members.get_mut(&creator) {
            member.permissions = PermissionSet::NONE;
        }
        assert!(has_capability(&project, creator, Capability::ManageMembers));
        assert_eq!(effective_role(&project, creator).1, PermissionSet::FULL);
    }

    #[test]
    fn stranger_only_views_documents_of_public_projects() {
        let stranger = Uuid::new_v4();
        let private = project(Uuid::new_v4(), false);
        let public = project(Uuid::new_v4(), true);

        for capability in ALL_CAPABILITIES {
            assert!(!has_capability(&private, stranger, capability));
        }
        assert!(has_capability(&public, stranger, Capability::ViewDocuments));
        assert!(!has_capability(&public, stranger, Capability::UploadDocuments));
        assert!(can_view_project(&public, stranger));
        assert!(!can_view_project(&private, stranger));
    }

    #[test]
    fn member_flags_drive_capabilities() {
        let mut project = project(Uuid::new_v4(), false);
        let viewer = user(true);
        add_member(&mut project, &viewer, ProjectRole::Viewer, None, Utc::now()).unwrap();

        assert!(has_capability(&project, viewer.id, Capability::ViewDocuments));
        assert!(!has_capability(&project, viewer.id, Capability::UploadDocuments));
        assert_eq!(effective_role(&project, viewer.id), (ProjectRole::Viewer, PermissionSet::VIEW_ONLY));
    }

    #[test]
    fn explicit_permissions_override_role_defaults() {
        let mut project = project(Uuid::new_v4(), false);
        let target = user(true);
        let custom = PermissionSet {
            can_manage_members: true,
            ..PermissionSet::NONE
        };
        let member = add_member(&mut project, &target, ProjectRole::Viewer, Some(custom), Utc::now()).unwrap();
        assert_eq!(member.permissions, custom);
        assert!(has_capability(&project, target.id, Capability::ManageMembers));
    }

    #[test]
    fn add_member_rejects_duplicates_and_unverified_users() {
        let mut project = project(Uuid::new_v4(), false);
        let verified = user(true);
        add_member(&mut project, &verified, ProjectRole::Researcher, None, Utc::now()).unwrap();
        assert_eq!(
            add_member(&mut project, &verified, ProjectRole::Viewer, None, Utc::now()),
            Err(MembershipError::DuplicateMember)
        );

        let unverified = user(false);
        assert_eq!(
            add_member(&mut project, &unverified, ProjectRole::ProjectManager, Some(PermissionSet::FULL), Utc::now()),
            Err(MembershipError::UnverifiedUser)
        );
        assert!(resolve_membership(&project, unverified.id).is_none());
    }

    #[test]
    fn self_join_requires_public_project() {
        let mut project = project(Uuid::new_v4(), false);
        assert_eq!(
            request_self_join(&mut project, Uuid::new_v4(), Utc::now()),
            Err(MembershipError::NotPublic)
        );
    }

    #[test]
    fn self_join_yields_collaborator_row() {
        let mut project = project(Uuid::new_v4(), true);
        project.status = crate::models::ProjectStatus::Active;
        let joiner = Uuid::new_v4();

        let member = request_self_join(&mut project, joiner, Utc::now()).unwrap();
        assert_eq!(member.role, ProjectRole::Collaborator);
        assert!(!member.permissions.can_edit);
        assert!(!member.permissions.can_manage_members);
        assert!(member.permissions.can_upload_documents);
        assert!(member.permissions.can_view_documents);

        assert_eq!(
            request_self_join(&mut project, joiner, Utc::now()),
            Err(MembershipError::AlreadyMember)
        );
    }

    #[test]
    fn creator_cannot_self_join() {
        let creator = Uuid::new_v4();
        let mut project = project(creator, true);
        project.members.clear();
        assert_eq!(
            request_self_join(&mut project, creator, Utc::now()),
            Err(MembershipError::AlreadyMember)
        );
    }
}

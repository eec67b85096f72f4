//! Project roles, the four project capabilities, and the fixed role → capability table.

use serde::{Deserialize, Serialize};

use crate::models::text_enum;

text_enum! {
    /// Role a member holds inside one project.
    ProjectRole("project role") {
        ProjectManager => "project_manager",
        Researcher => "researcher",
        Collaborator => "collaborator",
        Viewer => "viewer",
    }
}

impl ProjectRole {
    /// Parses a role name, falling back to `Collaborator` for anything unrecognized.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(ProjectRole::Collaborator)
    }

    pub const fn default_permissions(self) -> PermissionSet {
        match self {
            ProjectRole::ProjectManager => PermissionSet::FULL,
            ProjectRole::Researcher => PermissionSet {
                can_edit: true,
                can_manage_members: false,
                can_upload_documents: true,
                can_view_documents: true,
            },
            ProjectRole::Collaborator => PermissionSet {
                can_edit: false,
                can_manage_members: false,
                can_upload_documents: true,
                can_view_documents: true,
            },
            ProjectRole::Viewer => PermissionSet::VIEW_ONLY,
        }
    }
}

/// One of the four project capabilities a member can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Edit,
    ManageMembers,
    UploadDocuments,
    ViewDocuments,
}

/// Explicit four-flag capability set stored on each membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_manage_members: bool,
    #[serde(default)]
    pub can_upload_documents: bool,
    #[serde(default)]
    pub can_view_documents: bool,
}

impl PermissionSet {
    pub const FULL: PermissionSet = PermissionSet {
        can_edit: true,
        can_manage_members: true,
        can_upload_documents: true,
        can_view_documents: true,
    };

    pub const NONE: PermissionSet = PermissionSet {
        can_edit: false,
        can_manage_members: false,
        can_upload_documents: false,
        can_view_documents: false,
    };

    pub const VIEW_ONLY: PermissionSet = PermissionSet {
        can_edit: false,
        can_manage_members: false,
        can_upload_documents: false,
        can_view_documents: true,
    };

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Edit => self.can_edit,
            Capability::ManageMembers => self.can_manage_members,
            Capability::UploadDocuments => self.can_upload_documents,
            Capability::ViewDocuments => self.can_view_documents,
        }
    }
}

/// A possibly partial capability set supplied by a caller. Absent flags keep the value of
/// the set it is laid over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionOverrides {
    pub can_edit: Option<bool>,
    pub can_manage_members: Option<bool>,
    pub can_upload_documents: Option<bool>,
    pub can_view_documents: Option<bool>,
}

impl PermissionOverrides {
    pub fn over(self, base: PermissionSet) -> PermissionSet {
        PermissionSet {
            can_edit: self.can_edit.unwrap_or(base.can_edit),
            can_manage_members: self.can_manage_members.unwrap_or(base.can_manage_members),
            can_upload_documents: self.can_upload_documents.unwrap_or(base.can_upload_documents),
            can_view_documents: self.can_view_documents.unwrap_or(base.can_view_documents),
        }
    }
}

/// Default capability set for a role name; unknown names get the collaborator row.
pub fn default_permissions_for_role(role: &str) -> PermissionSet {
    ProjectRole::parse_or_default(role).default_permissions()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_table_matches_fixed_rows() {
        let pm = default_permissions_for_role("project_manager");
        assert_eq!(pm, PermissionSet::FULL);

        let researcher = default_permissions_for_role("researcher");
        assert!(researcher.can_edit && researcher.can_upload_documents && researcher.can_view_documents);
        assert!(!researcher.can_manage_members);

        let collaborator = default_permissions_for_role("collaborator");
        assert!(!collaborator.can_edit && !collaborator.can_manage_members);
        assert!(collaborator.can_upload_documents && collaborator.can_view_documents);

        assert_eq!(default_permissions_for_role("viewer"), PermissionSet::VIEW_ONLY);
    }

    #[test]
    fn unknown_role_falls_back_to_collaborator() {
        assert_eq!(ProjectRole::parse_or_default("owner"), ProjectRole::Collaborator);
        assert_eq!(
            default_permissions_for_role(""),
            ProjectRole::Collaborator.default_permissions()
        );
    }

    #[test]
    fn allows_reads_the_matching_flag() {
        let set = ProjectRole::Collaborator.default_permissions();
        assert!(set.allows(Capability::UploadDocuments));
        assert!(!set.allows(Capability::Edit));
        assert!(!PermissionSet::NONE.allows(Capability::ViewDocuments));
    }

    #[test]
    fn overrides_fill_gaps_from_the_base_row() {
        let partial: PermissionOverrides = serde_json::from_value(serde_json::json!({ "canManageMembers": true })).unwrap();
        let set = partial.over(ProjectRole::Collaborator.default_permissions());
        assert!(set.can_manage_members);
        assert!(set.can_upload_documents && set.can_view_documents);
        assert!(!set.can_edit);

        let revoke: PermissionOverrides = serde_json::from_value(serde_json::json!({ "canViewDocuments": false })).unwrap();
        assert!(!revoke.over(PermissionSet::FULL).can_view_documents);
        assert_eq!(PermissionOverrides::default().over(PermissionSet::VIEW_ONLY), PermissionSet::VIEW_ONLY);
    }

    #[test]
    fn permission_set_uses_camel_case_flags() {
        let json = serde_json::to_value(PermissionSet::VIEW_ONLY).unwrap();
        assert_eq!(json["canViewDocuments"], true);
        assert_eq!(json["canManageMembers"], false);
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;
use crate::access::permissions::{PermissionSet, ProjectRole};

text_enum! {
    /// Any authorized update may move a project to any status.
    ProjectStatus("project status") {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    ProjectCategory("project category") {
        Research => "research",
        Development => "development",
        Analysis => "analysis",
        Collaboration => "collaboration",
        Other => "other",
    }
}

text_enum! {
    DeliverableStatus("deliverable status") {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

text_enum! {
    TaskStatus("task status") {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        OnHold => "on_hold",
    }
}

text_enum! {
    TaskPriority("task priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for DeliverableStatus {
    fn default() -> Self {
        DeliverableStatus::Pending
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: DeliverableStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Membership of one user in one project. Embedded in the project, no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub permissions: PermissionSet,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub goals: Vec<String>,
    pub objectives: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub tasks: Vec<Task>,
    pub timeline: Timeline,
    pub created_by: Uuid,
    /// Keyed by user id; a user appears at most once.
    pub members: HashMap<Uuid, Member>,
    pub status: ProjectStatus,
    pub category: ProjectCategory,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new project, already validated.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub goals: Vec<String>,
    pub objectives: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub timeline: Timeline,
    pub category: ProjectCategory,
    pub is_public: bool,
    pub tags: Vec<String>,
}

impl Project {
    /// Builds a project in `planning` with the creator enrolled as project manager.
    pub fn create(fields: NewProject, created_by: Uuid, now: DateTime<Utc>) -> Self {
        let mut members = HashMap::new();
        members.insert(
            created_by,
            Member {
                user_id: created_by,
                role: ProjectRole::ProjectManager,
                permissions: ProjectRole::ProjectManager.default_permissions(),
                joined_at: now,
            },
        );

        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            goals: fields.goals,
            objectives: fields.objectives,
            deliverables: fields.deliverables,
            tasks: Vec::new(),
            timeline: fields.timeline,
            created_by,
            members,
            status: ProjectStatus::Planning,
            category: fields.category,
            is_public: fields.is_public,
            tags: fields.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Members ordered by join time, for display.
    pub fn members_in_join_order(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self.members.values().collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fields() -> NewProject {
        let now = Utc::now();
        NewProject {
            title: "Protein folding".into(),
            description: "Predicting tertiary structure".into(),
            goals: vec!["g".into()],
            objectives: vec!["o".into()],
            deliverables: vec![],
            timeline: Timeline {
                start_date: now,
                end_date: now + Duration::days(30),
            },
            category: ProjectCategory::Research,
            is_public: false,
            tags: vec![],
        }
    }

    #[test]
    fn creator_is_enrolled_as_project_manager() {
        let creator = Uuid::new_v4();
        let project = Project::create(fields(), creator, Utc::now());
        let member = &project.members[&creator];
        assert_eq!(member.role, ProjectRole::ProjectManager);
        assert_eq!(member.permissions, PermissionSet::FULL);
        assert_eq!(project.status, ProjectStatus::Planning);
    }

    #[test]
    fn task_defaults_fill_missing_fields() {
        let task: Task = serde_json::from_value(serde_json::json!({ "title": "Collect samples" })).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.assigned_to.is_none());
    }
}

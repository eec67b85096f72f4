// handlers/protected/projects/mod.rs - Project endpoints (verified email required)

pub mod create;  // POST /api/projects
pub mod list;    // GET /api/projects
pub mod members; // POST /api/projects/:id/members, POST /api/projects/:id/join
pub mod show;    // GET /api/projects/:id
pub mod update;  // PUT /api/projects/:id

pub use create::project_post;
pub use list::projects_get;
pub use members::{join_post, member_post};
pub use show::project_get;
pub use update::project_put;

use serde::Deserialize;

use crate::api::params::Validator;
use crate::models::Timeline;

use crate::handlers::utils::parse_date;

/// Timeline as submitted; both ends are required and must be ordered.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineInput {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TimelineInput {
    pub(crate) fn validate(&self, validator: &mut Validator) -> Option<Timeline> {
        let start = self.start_date.as_deref().and_then(parse_date);
        let end = self.end_date.as_deref().and_then(parse_date);
        match (start, end) {
            (Some(start_date), Some(end_date)) if start_date < end_date => Some(Timeline { start_date, end_date }),
            (Some(_), Some(_)) => {
                validator.check(false, "End date must be after start date");
                None
            }
            _ => {
                validator.check(false, "Project timeline with valid start and end dates is required");
                None
            }
        }
    }
}

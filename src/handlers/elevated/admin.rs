// handlers/elevated/admin.rs - /api/admin/* handlers

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::api::format::UserProfile;
use crate::api::params::non_empty;
use crate::database::store::UserQuery;
use crate::database::{PageInfo, Pagination};
use crate::handlers::utils::parse_optional;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserProfile>,
    pub pagination: PageInfo,
}

/// GET /api/admin/users?page&limit&role&search - newest accounts first
pub async fn users_get(State(state): State<AppState>, Query(params): Query<UserListParams>) -> ApiResult<UserList> {
    let api = &state.config.api;
    let pagination = Pagination::new(params.page, params.limit, api.default_page_size, api.max_page_size);
    let query = UserQuery {
        role: parse_optional(params.role.as_deref())?,
        search: non_empty(params.search),
        pagination,
    };

    let page = state.store.list_users(&query).await?;
    Ok(ApiResponse::success(UserList {
        users: page.items.iter().map(UserProfile::from).collect(),
        pagination: PageInfo::new(pagination, page.total),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDistribution {
    pub researchers: u64,
    pub academic_managers: u64,
    pub administrators: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub total_users: u64,
    pub verified_users: u64,
    pub unverified_users: u64,
    pub role_distribution: RoleDistribution,
}

/// GET /api/admin/stats
pub async fn stats_get(State(state): State<AppState>) -> ApiResult<UserStatsResponse> {
    let stats = state.store.user_stats().await?;
    Ok(ApiResponse::success(UserStatsResponse {
        total_users: stats.total_users,
        verified_users: stats.verified_users,
        unverified_users: stats.unverified_users,
        role_distribution: RoleDistribution {
            researchers: stats.researchers,
            academic_managers: stats.academic_managers,
            administrators: stats.administrators,
        },
    }))
}

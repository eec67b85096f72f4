// handlers/protected/documents/download.rs - GET /api/documents/:id/download handler

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::Response,
    Extension,
};
use chrono::Utc;

use super::can_read;
use crate::error::ApiError;
use crate::handlers::files::file_response;
use crate::handlers::utils::{denied, load_document, load_project, parse_id};
use crate::middleware::CurrentUser;
use crate::models::DownloadRecord;
use crate::AppState;

/// First hop of `X-Forwarded-For` when present, otherwise the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/**
 * GET /api/documents/:id/download - Stream the current file
 *
 * Records the download (user, time, client address) and bumps the view counters before the
 * body starts streaming.
 */
pub async fn download_get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = load_document(state.store.as_ref(), parse_id(&id, "document")?).await?;
    if !document.is_active() {
        return Err(ApiError::not_found("Document not available"));
    }

    let project = load_project(state.store.as_ref(), document.project_id).await?;
    if !can_read(&document, &project, user.id) {
        return Err(denied(
            user.id,
            "download document",
            "You do not have permission to download this document",
        ));
    }

    let response = file_response(
        state.files.as_ref(),
        &document.file_path,
        &document.original_name,
        &document.mime_type,
        document.file_size,
    )
    .await?;

    let record = DownloadRecord {
        user_id: user.id,
        downloaded_at: Utc::now(),
        ip_address: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
    };
    state.store.record_download(document.id, &record).await?;

    Ok(response)
}

// handlers/utils.rs - Loaders and request parsing shared across handler tiers

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::params::non_blank;
use crate::database::Store;
use crate::error::ApiError;
use crate::models::{Discussion, Document, Forum, Project, Reply, UnknownVariant};

/// Parses a path id. A malformed id can never name an existing record.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} id", what)))
}

/// Parses an optional closed-enum value from a query string or body.
pub fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = UnknownVariant>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: UnknownVariant| ApiError::bad_request(e.to_string())),
    }
}

/// Comma separated tag list from a form field.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tags arrive either as a JSON list or as the comma string multipart forms use.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => non_blank(tags),
            TagsInput::Csv(raw) => parse_tags(&raw),
        }
    }
}

/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub async fn load_project(store: &dyn Store, id: Uuid) -> Result<Project, ApiError> {
    store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

pub async fn load_document(store: &dyn Store, id: Uuid) -> Result<Document, ApiError> {
    store
        .find_document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

pub async fn load_forum(store: &dyn Store, id: Uuid) -> Result<Forum, ApiError> {
    store
        .find_forum(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Forum not found"))
}

pub async fn load_discussion(store: &dyn Store, id: Uuid) -> Result<Discussion, ApiError> {
    store
        .find_discussion(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Discussion not found"))
}

pub async fn load_reply(store: &dyn Store, id: Uuid) -> Result<Reply, ApiError> {
    store
        .find_reply(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reply not found"))
}

/// Logs the refusal and builds the 403.
pub fn denied(user_id: Uuid, action: &str, message: &str) -> ApiError {
    tracing::warn!("User {} denied: {}", user_id, action);
    ApiError::forbidden(message)
}

// handlers/protected/forums/post_body.rs - Discussion and reply bodies, JSON or multipart

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::handlers::files::{discard_uploads, save_upload};
use crate::models::StoredUpload;
use crate::AppState;

pub const ATTACHMENT_FIELD: &str = "attachments";

/// A forum post body with at most `MAX` attached files.
///
/// JSON bodies carry no files. Multipart bodies send the text fields as parts and each file as
/// an `attachments` part; the files are already stored when the handler runs, so the handler
/// must discard them if it does not keep them.
pub struct PostBody<T, const MAX: usize> {
    pub body: T,
    pub files: Vec<StoredUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

#[async_trait]
impl<T, const MAX: usize> FromRequest<AppState> for PostBody<T, MAX>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(body) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            return Ok(Self { body, files: Vec::new() });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let mut fields = Map::new();
        let mut files = Vec::new();
        let mut overflow = false;
        let read: Result<(), ApiError> = async {
            // Read to the end so the client is never cut off mid-body.
            while let Some(field) = multipart.next_field().await? {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                if name == ATTACHMENT_FIELD {
                    if files.len() == MAX {
                        overflow = true;
                        continue;
                    }
                    files.push(save_upload(state.files.as_ref(), field).await?);
                } else {
                    let text = field.text().await?;
                    if !text.trim().is_empty() {
                        fields.insert(name, Value::String(text));
                    }
                }
            }
            if overflow {
                return Err(ApiError::bad_request(format!("At most {} attachments are allowed", MAX)));
            }
            Ok(())
        }
        .await;

        let body = read.and_then(|()| {
            serde_json::from_value(Value::Object(fields)).map_err(|e| ApiError::bad_request(e.to_string()))
        });
        match body {
            Ok(body) => Ok(Self { body, files }),
            Err(e) => {
                discard_uploads(state.files.as_ref(), &files).await;
                Err(e)
            }
        }
    }
}

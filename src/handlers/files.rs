// handlers/files.rs - Multipart file parts in, stored files streamed back out

use std::io;

use axum::{
    body::Body,
    extract::multipart::Field,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{StreamExt, TryStreamExt};

use crate::error::ApiError;
use crate::models::StoredUpload;
use crate::services::{FileStorage, StorageError};

/// Streams one multipart file part to storage.
pub async fn save_upload(files: &dyn FileStorage, field: Field<'_>) -> Result<StoredUpload, ApiError> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let bytes = field
        .map_err(|e| {
            let kind = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                io::ErrorKind::InvalidData
            } else {
                io::ErrorKind::Other
            };
            io::Error::new(kind, e.body_text())
        })
        .boxed();

    files.save(&original_name, &mime_type, bytes).await.map_err(|e| match e {
        StorageError::Io(io) if io.kind() == io::ErrorKind::InvalidData => {
            ApiError::payload_too_large("Uploaded file is too large")
        }
        other => other.into(),
    })
}

/// Best-effort removal of files whose record was never written.
pub async fn discard_uploads(files: &dyn FileStorage, uploads: &[StoredUpload]) {
    for upload in uploads {
        if let Err(e) = files.delete(&upload.file_path).await {
            tracing::error!("Failed to remove orphaned upload {}: {}", upload.file_path, e);
        }
    }
}

/// Quotes and control characters would break the header.
pub fn attachment_disposition(original_name: &str) -> HeaderValue {
    let safe: String = original_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// A stored file as a download response. Missing bytes are a 404.
pub async fn file_response(
    files: &dyn FileStorage,
    path: &str,
    original_name: &str,
    mime_type: &str,
    size: i64,
) -> Result<Response, ApiError> {
    if !files.exists(path).await {
        tracing::error!("Stored file missing: {}", path);
        return Err(ApiError::not_found("File not found on server"));
    }
    let stream = files.read(path).await?;

    let content_type =
        HeaderValue::from_str(mime_type).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, attachment_disposition(original_name)),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_neutralizes_quotes() {
        let value = attachment_disposition("bad\"name.pdf");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"bad_name.pdf\"");
        assert_eq!(attachment_disposition("résumé.txt").to_str().unwrap(), "attachment; filename=\"r_sum_.txt\"");
    }
}

//! Uploaded file bytes on local disk.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::models::StoredUpload;

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Writes the whole stream durably before returning its stored location.
    async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        data: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<StoredUpload, StorageError>;

    async fn exists(&self, path: &str) -> bool;

    async fn read(&self, path: &str) -> Result<ByteStream, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Creates the upload directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Only paths under the upload root, without `..` components, are served or deleted.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(path);
        let escapes = candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes || !candidate.starts_with(&self.root) {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(candidate.to_path_buf())
    }
}

/// Keeps the extension and a readable stem, drops anything that could act as a path.
fn stored_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}-{}", Uuid::new_v4(), cleaned)
    }
}

fn file_stream(file: tokio::fs::File) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), file)))
    })
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        mut data: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<StoredUpload, StorageError> {
        let file_name = stored_file_name(original_name);
        let path = self.root.join(&file_name);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut written: i64 = 0;
        let result: Result<(), io::Error> = async {
            while let Some(chunk) = data.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as i64;
            }
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::error!("Failed to remove partial upload {}: {}", path.display(), cleanup);
            }
            return Err(e.into());
        }

        Ok(StoredUpload {
            file_name,
            original_name: original_name.to_string(),
            file_path: path.to_string_lossy().into_owned(),
            file_size: written,
            mime_type: mime_type.to_string(),
        })
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(p) => tokio::fs::try_exists(p).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read(&self, path: &str) -> Result<ByteStream, StorageError> {
        let resolved = self.resolve(path)?;
        let file = tokio::fs::File::open(&resolved).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(file_stream(file).boxed())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
